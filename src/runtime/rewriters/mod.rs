pub mod app_lam;
pub mod app_par;
pub mod dup_ctr;
pub mod dup_dup;
pub mod dup_lam;
pub mod dup_par;
