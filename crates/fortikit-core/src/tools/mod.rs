//! One module per product, plus inventory and config listings.

pub mod cloud;
pub mod ems;
pub mod faz;
pub mod fgt;
pub mod fmg;
pub mod get;
