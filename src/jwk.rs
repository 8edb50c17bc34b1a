//! RFC 7517 JSON Web Key value type and its public projection.
//!
//! A single struct carries both the full (private) form persisted by stores
//! and the stripped public form published in key sets; the serializer omits
//! absent fields entirely so discovery documents never contain `null`.

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A JSON Web Key.
///
/// Private members (`d`, `p`, `q`, CRT values, `k`) are zeroized on drop.
/// 中文: 私有成员在离开作用域时自动清零。
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct JsonWebKey {
    /// Key type: `"RSA"`, `"EC"` or `"oct"`.
    pub kty: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    #[serde(rename = "use", skip_serializing_if = "Option::is_none")]
    pub use_: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,

    // RSA 公开参数
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,

    // RSA 私有参数。CRT 值接受反序列化，但本库生成时不填充。
    #[serde(skip_serializing_if = "Option::is_none")]
    pub d: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dq: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qi: Option<String>,

    // 椭圆曲线参数（d 与 RSA 私有指数共用字段）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crv: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,

    // 对称密钥
    #[serde(skip_serializing_if = "Option::is_none")]
    pub k: Option<String>,
}

impl JsonWebKey {
    /// The public projection of this key, or `None` for symmetric keys.
    ///
    /// Strips every private component and keeps only what a verifier needs:
    /// `kid`/`use`/`alg` metadata plus `n`/`e` for RSA or `crv`/`x`/`y` for
    /// EC. Symmetric keys have no public form and must never enter a key set.
    /// Deterministic: the same key always yields the same projection.
    pub fn public_projection(&self) -> Option<JsonWebKey> {
        if self.kty == "oct" {
            return None;
        }
        Some(JsonWebKey {
            kty: self.kty.clone(),
            kid: self.kid.clone(),
            use_: self.use_.clone(),
            alg: self.alg.clone(),
            n: self.n.clone(),
            e: self.e.clone(),
            crv: self.crv.clone(),
            x: self.x.clone(),
            y: self.y.clone(),
            d: None,
            p: None,
            q: None,
            dp: None,
            dq: None,
            qi: None,
            k: None,
        })
    }

    /// Whether any private component is present.
    pub fn has_private_components(&self) -> bool {
        self.d.is_some()
            || self.p.is_some()
            || self.q.is_some()
            || self.dp.is_some()
            || self.dq.is_some()
            || self.qi.is_some()
            || self.k.is_some()
    }

}
