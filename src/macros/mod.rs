// HACK: instead of `#[macro_export]` we use `pub(crate) use <macro>`
// so that we can use `macros::<macro>!` inside the crate, the binary
// reaches them through the lib crate's root exports
#![allow(unused_imports)]

#[macro_export]
macro_rules! parse_address {
    ($addr:tt) => {
        $addr.parse::<alloy::primitives::Address>().unwrap()
    };
}

#[macro_export]
macro_rules! global {
    ($x:ident) => {
        $crate::globals::G.$x.lock().unwrap()
    };
}

#[macro_export]
macro_rules! global_set {
    ($x:ident) => {
        *$crate::globals::G.$x.lock().unwrap()
    };
}

pub(crate) use global;
pub(crate) use global_set;
pub(crate) use parse_address;
