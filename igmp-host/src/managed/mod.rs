//! Fixed capacity containers.
//!
//! A strict `no_std` crate can not allocate on its own. The containers here store their elements
//! inline with a capacity chosen at compile time through a const generic parameter. Running out of
//! space is reported to the caller instead of reallocating.
mod list;
mod slots;

pub use self::list::List;
pub use self::slots::Slots;
