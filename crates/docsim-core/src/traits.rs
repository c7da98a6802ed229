/// Encoding service boundary: text in, fixed-width vectors out.
///
/// Implementations must be deterministic for identical input text and
/// `model_id`, and must return exactly one `dim()`-length vector per input.
pub trait Embedder: Send + Sync {
    /// Stable identifier of the model (e.g. `hashing-xxh64:d384`).
    fn model_id(&self) -> &str;
    /// Embedding dimensionality.
    fn dim(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
}
