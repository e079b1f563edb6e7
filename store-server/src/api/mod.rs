//! API 路由模块
//!
//! # 结构
//!
//! - [`health`] - 健康检查
//! - [`auth`] - 认证相关接口
//! - [`upload`] - 图片上传与读取接口
//! - [`categories`] - 分类管理接口
//! - [`products`] - 商品管理接口
//! - [`invoices`] - 发票管理接口
//! - [`statistics`] - 销售统计接口

pub mod convert;

pub mod auth;
pub mod health;
pub mod upload;

// Data models API
pub mod categories;
pub mod invoices;
pub mod products;
pub mod statistics;
