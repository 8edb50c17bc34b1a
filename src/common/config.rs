//!
//! # 通用配置模块
//!
//! 包含密钥生命周期引擎所使用的核心配置结构。
//! 这些结构定义了签名/加密算法、密钥有效期和发现文档的保留策略。
//!
use serde::{Deserialize, Serialize};

/// JWKS 管理器配置。
///
/// 构造时一次性注入，引擎只读；`JwksService::new` 会立即解析两个算法
/// 标识符，配置错误在启动阶段就会失败。
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct JwksOptions {
    /// 当前签名算法标识符（JWS，例如 "ES256"）
    #[serde(default = "default_algorithm")]
    pub algorithm: String,
    /// 当前加密算法标识符（JWE，例如 "RSA-OAEP"）
    #[serde(default = "default_encryption_algorithm")]
    pub encryption_algorithm: String,
    /// 密钥的有效天数
    #[serde(default = "default_days_until_expire")]
    pub days_until_expire: u32,
    /// 发现文档中保留的最近密钥数量
    #[serde(default = "default_keys_to_keep")]
    pub keys_to_keep: usize,
}

fn default_algorithm() -> String {
    "ES256".to_string()
}

fn default_encryption_algorithm() -> String {
    "RSA-OAEP".to_string()
}

fn default_days_until_expire() -> u32 {
    90
}

fn default_keys_to_keep() -> usize {
    2
}

impl Default for JwksOptions {
    fn default() -> Self {
        Self {
            algorithm: default_algorithm(),
            encryption_algorithm: default_encryption_algorithm(),
            days_until_expire: default_days_until_expire(),
            keys_to_keep: default_keys_to_keep(),
        }
    }
}

impl JwksOptions {
    /// 以 `chrono::Duration` 返回配置的有效期。
    pub fn validity(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.days_until_expire))
    }
}
