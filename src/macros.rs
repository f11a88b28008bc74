/// Branch-weight hints. Rust has no stable `likely`/`unlikely` intrinsics so
/// these are documentation-only pass-throughs; keeping the call sites marked
/// preserves the hot-path structure.
macro_rules! likely {
    ($e:expr) => {
        $e
    };
}

macro_rules! unlikely {
    ($e:expr) => {
        $e
    };
}
