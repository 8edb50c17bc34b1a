use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use std::ops::Deref;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// 将字节序列编码为 base64url（无填充），即 JWK 参数使用的编码。
pub fn to_base64url(data: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(data)
}

/// 从 base64url（无填充）解码字节序列。
pub fn from_base64url(data: &str) -> Result<Vec<u8>, base64::DecodeError> {
    URL_SAFE_NO_PAD.decode(data)
}

/// 自动清零的字节向量，用于私钥 DER 等敏感数据。
///
/// 当对象离开作用域时，自动清除内存中的敏感数据。
#[derive(Clone, Debug, PartialEq, Zeroize, ZeroizeOnDrop)]
pub struct ZeroizingVec(pub Vec<u8>);

impl Deref for ZeroizingVec {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<[u8]> for ZeroizingVec {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
