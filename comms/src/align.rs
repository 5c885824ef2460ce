/// Primitive number types whose alignment is a multiple of 4 bytes.
///
/// Receive buffers are made of these so that `f32` payloads can be
/// reinterpreted in place after the 4 byte message header.
pub trait Align4: bytemuck::Pod {}

macro_rules! impl_align4 {
    ($($t:ty),*) => {
        $(impl Align4 for $t {})*
    };
}

impl_align4!(u32, i32, u64, i64, f32, f64);
