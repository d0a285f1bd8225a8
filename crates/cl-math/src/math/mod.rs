//! Core math modules.

pub mod corr;
pub mod lkj;
pub mod multinomial;
pub mod mvn;
pub mod scalar;
pub mod stable;
pub mod student_t;
pub mod transform;
