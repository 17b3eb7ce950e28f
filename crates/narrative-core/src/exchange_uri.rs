//! Trust-exchange URI, the value carried by a QR code when two people meet:
//! `narrative://verify/<did>?userDoc=<percent-encoded document address>`.

use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;
use crate::types::Did;

const URI_PREFIX: &str = "narrative://verify/";
const USER_DOC_PARAM: &str = "userDoc";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustExchangeUri {
    pub did: Did,
    /// Personal-document address of `did`. Needed for bidirectional
    /// propagation and for resolving the profile before any trust exists.
    pub user_doc: Option<String>,
}

impl TrustExchangeUri {
    pub fn new(did: Did, user_doc: Option<String>) -> Self {
        Self { did, user_doc }
    }

    pub fn parse(input: &str) -> Result<Self, CoreError> {
        let rest = input
            .trim()
            .strip_prefix(URI_PREFIX)
            .ok_or_else(|| CoreError::InvalidUri(format!("expected '{}' prefix", URI_PREFIX)))?;

        let (did_part, query) = match rest.split_once('?') {
            Some((d, q)) => (d, Some(q)),
            None => (rest, None),
        };
        let did_part = did_part.trim_end_matches('/');
        if did_part.is_empty() {
            return Err(CoreError::InvalidUri("missing DID segment".into()));
        }
        let did_str = urlencoding::decode(did_part)
            .map_err(|e| CoreError::InvalidUri(format!("undecodable DID segment: {}", e)))?;
        let did = Did::new(did_str.into_owned())?;

        let mut user_doc = None;
        for pair in query.into_iter().flat_map(|q| q.split('&')) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            if key != USER_DOC_PARAM {
                continue;
            }
            let decoded = urlencoding::decode(value)
                .map_err(|e| CoreError::InvalidUri(format!("undecodable userDoc: {}", e)))?;
            if !decoded.is_empty() {
                user_doc = Some(decoded.into_owned());
            }
        }

        Ok(Self { did, user_doc })
    }
}

impl fmt::Display for TrustExchangeUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", URI_PREFIX, self.did)?;
        if let Some(doc) = &self.user_doc {
            write!(f, "?{}={}", USER_DOC_PARAM, urlencoding::encode(doc))?;
        }
        Ok(())
    }
}

impl FromStr for TrustExchangeUri {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DID: &str = "did:key:z6MkhaXgBZDvotDkL5257faiztiGiC2QtKLGpbnnEGta2doK";

    #[test]
    fn test_parse_with_user_doc() {
        let uri = format!("narrative://verify/{}?userDoc=automerge%3A4Xy%2Fz", DID);
        let parsed = TrustExchangeUri::parse(&uri).unwrap();
        assert_eq!(parsed.did.uri(), DID);
        assert_eq!(parsed.user_doc.as_deref(), Some("automerge:4Xy/z"));
    }

    #[test]
    fn test_parse_without_user_doc() {
        let parsed = TrustExchangeUri::parse(&format!("narrative://verify/{}", DID)).unwrap();
        assert!(parsed.user_doc.is_none());
    }

    #[test]
    fn test_parse_ignores_unknown_params() {
        let uri = format!("narrative://verify/{}?foo=bar&userDoc=doc%3A1", DID);
        let parsed = TrustExchangeUri::parse(&uri).unwrap();
        assert_eq!(parsed.user_doc.as_deref(), Some("doc:1"));
    }

    #[test]
    fn test_display_then_parse() {
        let uri = TrustExchangeUri::new(Did::new(DID).unwrap(), Some("doc:a b/c".into()));
        let text = uri.to_string();
        assert!(text.contains("userDoc=doc%3Aa%20b%2Fc"));
        assert_eq!(text.parse::<TrustExchangeUri>().unwrap(), uri);
    }

    #[test]
    fn test_rejects_wrong_scheme() {
        assert!(matches!(
            TrustExchangeUri::parse(&format!("https://verify/{}", DID)),
            Err(CoreError::InvalidUri(_))
        ));
    }

    #[test]
    fn test_rejects_missing_did() {
        assert!(TrustExchangeUri::parse("narrative://verify/?userDoc=x").is_err());
    }

    #[test]
    fn test_rejects_malformed_did() {
        assert!(matches!(
            TrustExchangeUri::parse("narrative://verify/not-a-did"),
            Err(CoreError::InvalidDid(_))
        ));
    }
}
