/// Construction-time configuration errors.
///
/// Parsing itself never fails: malformed markdown degrades to the grammar
/// engine's best-effort tree. Only invalid options are rejected, up front.
#[derive(Debug, thiserror::Error)]
pub enum OptionsError {
    #[error("container marker must be a printable non-whitespace character")]
    BlankContainerMarker,
    #[error("container marker length must be at least 1")]
    ZeroMarkerLength,
    #[error("chars-per-tick range is inverted: {min} > {max}")]
    InvertedStepRange { min: usize, max: usize },
}
