//! Final mix stage.

/// Soft-clip a span of the additive channel mix in place.
pub fn soft_clip(buffer: &mut [f32]) {
    for s in buffer.iter_mut() {
        *s = libm::tanhf(*s);
    }
}
