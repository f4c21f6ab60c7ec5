//! End-to-end scenarios across pool, ingestion, engine and answering.
