//! catlearn math utilities.

pub mod math;

pub use math::corr::*;
pub use math::lkj::lkj_corr_cholesky_lpdf;
pub use math::multinomial;
pub use math::mvn::{cholesky_lower, multi_normal_cholesky_lpdf};
pub use math::scalar::*;
pub use math::stable::*;
pub use math::student_t::multi_student_t_cholesky_lpdf;
pub use math::transform;
