//! The claims model backing every item: a closed set of namespaced claim
//! names and an insertion-ordered map of claim values with typed, lazily
//! coerced access.
//!
//! Claim values live in the map as the JSON-native forms they travel in on
//! the wire. Typed access parses on first use and memoizes the parsed form,
//! so repeated reads of (say) a UUID claim pay the string parse once. The
//! raw map is what gets canonicalized, so the memo table never influences
//! encoding.

use crate::{
    capability::{IdentityCapability, KeyCapability},
    error::{Error, Result},
    item_link::ItemLink,
    util::{ser, Timestamp},
};
use serde_json::Value;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Mutex;
use url::Url;
use uuid::Uuid;

/// The enumerated, namespaced claim names. The wire name of each claim is a
/// fixed three-letter string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Claim {
    /// Ambit list: the domains an identity claims to operate in.
    Amb,
    /// Audience: the unique id of the intended receiver.
    Aud,
    /// Capability list (key or identity capabilities).
    Cap,
    /// Common name.
    Cmn,
    /// Free-form context string.
    Ctx,
    /// Expires-at timestamp.
    Exp,
    /// Issued-at timestamp.
    Iat,
    /// Issuer: the unique id of the issuing entity.
    Iss,
    /// Issuer URL.
    Isu,
    /// Secret key material, in suite-prefixed text encoding.
    Key,
    /// Key id: the unique id of the key item used for signing.
    Kid,
    /// Item links.
    Lnk,
    /// MIME type of an attached payload.
    Mim,
    /// Method list: the verification methods an identity supports.
    Mtd,
    /// Principals map: arbitrary claims about the identity's subject.
    Pri,
    /// Public key material, in suite-prefixed text encoding.
    Pub,
    /// Subject: the unique id of the entity the item concerns.
    Sub,
    /// System name: the name of the issuing system.
    Sys,
    /// Unique id of the item itself.
    Uid,
}

impl Claim {
    /// The wire name of this claim.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Amb => "amb",
            Self::Aud => "aud",
            Self::Cap => "cap",
            Self::Cmn => "cmn",
            Self::Ctx => "ctx",
            Self::Exp => "exp",
            Self::Iat => "iat",
            Self::Iss => "iss",
            Self::Isu => "isu",
            Self::Key => "key",
            Self::Kid => "kid",
            Self::Lnk => "lnk",
            Self::Mim => "mim",
            Self::Mtd => "mtd",
            Self::Pri => "pri",
            Self::Pub => "pub",
            Self::Sub => "sub",
            Self::Sys => "sys",
            Self::Uid => "uid",
        }
    }
}

impl std::fmt::Display for Claim {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Claim {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "amb" => Ok(Self::Amb),
            "aud" => Ok(Self::Aud),
            "cap" => Ok(Self::Cap),
            "cmn" => Ok(Self::Cmn),
            "ctx" => Ok(Self::Ctx),
            "exp" => Ok(Self::Exp),
            "iat" => Ok(Self::Iat),
            "iss" => Ok(Self::Iss),
            "isu" => Ok(Self::Isu),
            "key" => Ok(Self::Key),
            "kid" => Ok(Self::Kid),
            "lnk" => Ok(Self::Lnk),
            "mim" => Ok(Self::Mim),
            "mtd" => Ok(Self::Mtd),
            "pri" => Ok(Self::Pri),
            "pub" => Ok(Self::Pub),
            "sub" => Ok(Self::Sub),
            "sys" => Ok(Self::Sys),
            "uid" => Ok(Self::Uid),
            _ => Err(Error::InvalidFormat(format!("unknown claim: {}", s))),
        }
    }
}

/// Memoized forms of the claim coercions that are worth caching. Public only
/// because the `ClaimValue` memo hooks name it; not part of the stable API.
#[doc(hidden)]
#[derive(Debug, Clone)]
pub enum Memo {
    Uuid(Uuid),
    Time(Timestamp),
    Url(Url),
    Links(Vec<ItemLink>),
}

/// A value that can be stored under a claim and read back in typed form.
///
/// `from_json` coerces the stored JSON-native value; an incompatible stored
/// value is a caller error (`Error::InvalidClaim`), not a data-integrity
/// failure. The memo hooks let expensive coercions opt in to caching.
pub trait ClaimValue: Sized {
    fn from_json(claim: Claim, value: &Value) -> Result<Self>;
    fn to_json(&self) -> Value;

    #[doc(hidden)]
    fn from_memo(_memo: &Memo) -> Option<Self> {
        None
    }

    #[doc(hidden)]
    fn to_memo(&self) -> Option<Memo> {
        None
    }
}

fn expect_str<'a>(claim: Claim, value: &'a Value) -> Result<&'a str> {
    value
        .as_str()
        .ok_or_else(|| Error::InvalidClaim(format!("claim {} does not hold a string", claim)))
}

impl ClaimValue for String {
    fn from_json(claim: Claim, value: &Value) -> Result<Self> {
        Ok(expect_str(claim, value)?.to_string())
    }

    fn to_json(&self) -> Value {
        Value::String(self.clone())
    }
}

impl ClaimValue for Uuid {
    fn from_json(claim: Claim, value: &Value) -> Result<Self> {
        Uuid::parse_str(expect_str(claim, value)?)
            .map_err(|_| Error::InvalidClaim(format!("claim {} does not hold a uuid", claim)))
    }

    fn to_json(&self) -> Value {
        Value::String(self.to_string())
    }

    fn from_memo(memo: &Memo) -> Option<Self> {
        match memo {
            Memo::Uuid(id) => Some(*id),
            _ => None,
        }
    }

    fn to_memo(&self) -> Option<Memo> {
        Some(Memo::Uuid(*self))
    }
}

impl ClaimValue for Timestamp {
    fn from_json(claim: Claim, value: &Value) -> Result<Self> {
        Timestamp::parse(expect_str(claim, value)?)
            .map_err(|_| Error::InvalidClaim(format!("claim {} does not hold a timestamp", claim)))
    }

    fn to_json(&self) -> Value {
        Value::String(self.to_wire())
    }

    fn from_memo(memo: &Memo) -> Option<Self> {
        match memo {
            Memo::Time(ts) => Some(*ts),
            _ => None,
        }
    }

    fn to_memo(&self) -> Option<Memo> {
        Some(Memo::Time(*self))
    }
}

impl ClaimValue for Url {
    fn from_json(claim: Claim, value: &Value) -> Result<Self> {
        Url::parse(expect_str(claim, value)?)
            .map_err(|_| Error::InvalidClaim(format!("claim {} does not hold a url", claim)))
    }

    fn to_json(&self) -> Value {
        Value::String(self.to_string())
    }

    fn from_memo(memo: &Memo) -> Option<Self> {
        match memo {
            Memo::Url(url) => Some(url.clone()),
            _ => None,
        }
    }

    fn to_memo(&self) -> Option<Memo> {
        Some(Memo::Url(self.clone()))
    }
}

impl ClaimValue for Vec<String> {
    fn from_json(claim: Claim, value: &Value) -> Result<Self> {
        serde_json::from_value(value.clone())
            .map_err(|_| Error::InvalidClaim(format!("claim {} does not hold a string list", claim)))
    }

    fn to_json(&self) -> Value {
        Value::Array(self.iter().cloned().map(Value::String).collect())
    }
}

impl ClaimValue for Vec<ItemLink> {
    fn from_json(claim: Claim, value: &Value) -> Result<Self> {
        ItemLink::decode_list(expect_str(claim, value)?)
            .map_err(|_| Error::InvalidClaim(format!("claim {} does not hold an item link list", claim)))
    }

    fn to_json(&self) -> Value {
        Value::String(ItemLink::encode_list(self))
    }

    fn from_memo(memo: &Memo) -> Option<Self> {
        match memo {
            Memo::Links(links) => Some(links.clone()),
            _ => None,
        }
    }

    fn to_memo(&self) -> Option<Memo> {
        Some(Memo::Links(self.clone()))
    }
}

impl ClaimValue for Vec<IdentityCapability> {
    fn from_json(claim: Claim, value: &Value) -> Result<Self> {
        serde_json::from_value(value.clone())
            .map_err(|_| Error::InvalidClaim(format!("claim {} does not hold identity capabilities", claim)))
    }

    fn to_json(&self) -> Value {
        let mut sorted = self.clone();
        sorted.sort();
        sorted.dedup();
        serde_json::to_value(sorted).expect("capability serialization is infallible")
    }
}

impl ClaimValue for Vec<KeyCapability> {
    fn from_json(claim: Claim, value: &Value) -> Result<Self> {
        serde_json::from_value(value.clone())
            .map_err(|_| Error::InvalidClaim(format!("claim {} does not hold key capabilities", claim)))
    }

    fn to_json(&self) -> Value {
        let mut sorted = self.clone();
        sorted.sort();
        sorted.dedup();
        serde_json::to_value(sorted).expect("capability serialization is infallible")
    }
}

impl ClaimValue for serde_json::Map<String, Value> {
    fn from_json(claim: Claim, value: &Value) -> Result<Self> {
        value
            .as_object()
            .cloned()
            .ok_or_else(|| Error::InvalidClaim(format!("claim {} does not hold a map", claim)))
    }

    fn to_json(&self) -> Value {
        Value::Object(self.clone())
    }
}

impl ClaimValue for Value {
    fn from_json(_claim: Claim, value: &Value) -> Result<Self> {
        Ok(value.clone())
    }

    fn to_json(&self) -> Value {
        self.clone()
    }
}

/// The typed, lazily-coerced key/value store backing every item.
#[derive(Debug, Default)]
pub struct ClaimsMap {
    values: serde_json::Map<String, Value>,
    memo: Mutex<HashMap<Claim, Memo>>,
}

impl ClaimsMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Typed claim access. Coerces the stored JSON-native form on first use
    /// and memoizes the result; an incompatible stored value is an error.
    pub fn get<T: ClaimValue>(&self, claim: Claim) -> Result<Option<T>> {
        {
            let memo = self.memo.lock().expect("dime_core::claim::ClaimsMap::get() -- memo lock poisoned");
            if let Some(cached) = memo.get(&claim) {
                if let Some(value) = T::from_memo(cached) {
                    return Ok(Some(value));
                }
            }
        }
        let raw = match self.values.get(claim.name()) {
            Some(raw) => raw,
            None => return Ok(None),
        };
        let typed = T::from_json(claim, raw)?;
        if let Some(memo) = typed.to_memo() {
            self.memo
                .lock()
                .expect("dime_core::claim::ClaimsMap::get() -- memo lock poisoned")
                .insert(claim, memo);
        }
        Ok(Some(typed))
    }

    /// Store a claim value. A `None` value is a no-op, which keeps optional
    /// claim plumbing at call sites flat.
    pub fn put<T: ClaimValue>(&mut self, claim: Claim, value: Option<T>) {
        if let Some(value) = value {
            self.invalidate(claim);
            self.values.insert(claim.name().to_string(), value.to_json());
        }
    }

    /// Store raw bytes under a claim, base64-encoded.
    pub fn put_bytes(&mut self, claim: Claim, bytes: Option<&[u8]>) {
        self.put(claim, bytes.map(|b| ser::base64_encode(b)));
    }

    pub fn remove(&mut self, claim: Claim) {
        self.invalidate(claim);
        self.values.remove(claim.name());
    }

    pub fn contains(&self, claim: Claim) -> bool {
        self.values.contains_key(claim.name())
    }

    pub fn size(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The deterministic JSON form of this map: compact, insertion-ordered.
    pub fn to_canonical_json(&self) -> Result<String> {
        ser::to_canonical_json(&self.values)
    }

    /// Parse a claims map from JSON text. Malformed text yields `None`.
    pub fn from_json(text: &str) -> Option<Self> {
        ser::from_json_object(text).map(|values| Self {
            values,
            memo: Mutex::new(HashMap::new()),
        })
    }

    fn invalidate(&mut self, claim: Claim) {
        self.memo
            .lock()
            .expect("dime_core::claim::ClaimsMap::invalidate() -- memo lock poisoned")
            .remove(&claim);
    }
}

impl Clone for ClaimsMap {
    fn clone(&self) -> Self {
        Self {
            values: self.values.clone(),
            memo: Mutex::new(HashMap::new()),
        }
    }
}

impl PartialEq for ClaimsMap {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values
    }
}
