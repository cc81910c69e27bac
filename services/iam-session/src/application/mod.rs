//! 应用层

pub mod dto;
