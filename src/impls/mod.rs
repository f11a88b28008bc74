mod native;

pub(crate) use native::SimdInput;
