//! Configured users and the engine-association cache.
//!
//! Credential rows come from an external configuration store. On load
//! they are copied into [`UserAssociation`] values: a row with a bound
//! engine id gets its keys derived immediately and lands in the cache's
//! `localized` collection; a row with an empty engine id is a template
//! in `unlocalized`, localized lazily the first time a message from a
//! concrete engine names its user.

use bytes::Bytes;

use super::auth::AuthKey;
use super::privacy::PrivKey;
use super::{AuthProtocol, PrivProtocol};
use crate::error::ConfigIssue;

/// One credential configuration row.
///
/// Validation is advisory: [`validate`](Self::validate) reports problems
/// but the row loads regardless.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UsmUserConfig {
    /// Engine id this row is bound to; empty means "any engine"
    /// (an unlocalized template).
    pub engine_id: Vec<u8>,
    /// The username as it appears in msgUserName.
    pub user_name: Vec<u8>,
    pub auth_protocol: AuthProtocol,
    pub auth_password: Vec<u8>,
    pub priv_protocol: PrivProtocol,
    pub priv_password: Vec<u8>,
}

impl UsmUserConfig {
    /// Create a template row (no engine binding).
    pub fn new(
        user_name: impl Into<Vec<u8>>,
        auth_protocol: AuthProtocol,
        auth_password: impl Into<Vec<u8>>,
        priv_protocol: PrivProtocol,
        priv_password: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            engine_id: Vec::new(),
            user_name: user_name.into(),
            auth_protocol,
            auth_password: auth_password.into(),
            priv_protocol,
            priv_password: priv_password.into(),
        }
    }

    /// Bind this row to a specific engine id.
    pub fn with_engine_id(mut self, engine_id: impl Into<Vec<u8>>) -> Self {
        self.engine_id = engine_id.into();
        self
    }

    /// Report advisory issues with this row.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        if self.user_name.is_empty() {
            issues.push(ConfigIssue::EmptyUserName);
        }
        if self.auth_password.len() < super::auth::MIN_PASSWORD_LENGTH {
            issues.push(ConfigIssue::ShortAuthPassword {
                len: self.auth_password.len(),
            });
        }
        if self.priv_password.len() < super::auth::MIN_PASSWORD_LENGTH {
            issues.push(ConfigIssue::ShortPrivPassword {
                len: self.priv_password.len(),
            });
        }
        for issue in &issues {
            tracing::warn!(user = %String::from_utf8_lossy(&self.user_name), %issue, "credential row issue");
        }
        issues
    }
}

/// A user credential bound to an engine, with derived keys.
///
/// The cache owns associations outright; each is built from a copy of a
/// configuration row and never shared back.
#[derive(Debug, Clone)]
pub struct UserAssociation {
    config: UsmUserConfig,
    engine_id: Bytes,
    auth_key: Option<AuthKey>,
    priv_key: Option<PrivKey>,
}

impl UserAssociation {
    /// Build an association from a configuration row.
    ///
    /// Keys are derived only when the row carries an engine binding;
    /// templates stay keyless until localized.
    fn from_config(config: UsmUserConfig) -> Self {
        let engine_id = Bytes::from(config.engine_id.clone());
        let mut assoc = Self {
            config,
            engine_id,
            auth_key: None,
            priv_key: None,
        };
        if !assoc.engine_id.is_empty() {
            assoc.derive_keys();
        }
        assoc
    }

    /// Derive authKey and privKey for the bound engine.
    ///
    /// Both keys are produced by the authentication algorithm's
    /// derivation and are digest-sized (16 or 20 bytes). The privacy
    /// algorithm only decides how the key bytes are consumed later;
    /// RFC 3414 specifies this coupling and interoperability depends
    /// on it.
    fn derive_keys(&mut self) {
        self.auth_key = Some(AuthKey::from_password(
            self.config.auth_protocol,
            &self.config.auth_password,
            &self.engine_id,
        ));
        self.priv_key = Some(PrivKey::from_password(
            self.config.auth_protocol,
            self.config.priv_protocol,
            &self.config.priv_password,
            &self.engine_id,
        ));
    }

    /// Localize a template for a concrete engine.
    fn localize(&self, engine_id: &[u8]) -> Self {
        let mut localized = self.clone();
        localized.engine_id = Bytes::copy_from_slice(engine_id);
        localized.derive_keys();
        localized
    }

    /// The username this association matches.
    pub fn user_name(&self) -> &[u8] {
        &self.config.user_name
    }

    /// The engine id this association is bound to (empty for templates).
    pub fn engine_id(&self) -> &[u8] {
        &self.engine_id
    }

    pub fn auth_protocol(&self) -> AuthProtocol {
        self.config.auth_protocol
    }

    pub fn priv_protocol(&self) -> PrivProtocol {
        self.config.priv_protocol
    }

    /// The derived authentication key, if localized.
    pub fn auth_key(&self) -> Option<&AuthKey> {
        self.auth_key.as_ref()
    }

    /// The derived privacy key, if localized.
    pub fn priv_key(&self) -> Option<&PrivKey> {
        self.priv_key.as_ref()
    }
}

/// Byte-string equality as the reference cache performs it: lengths must
/// agree, and the comparison walks only the shorter of the two lengths.
/// The truncated walk is redundant once lengths match but is preserved
/// deliberately for wire compatibility - do not "fix" it.
fn cache_eq(stored: &[u8], given: &[u8]) -> bool {
    if stored.len() != given.len() {
        return false;
    }
    let n = stored.len().min(given.len());
    stored[..n] == given[..n]
}

/// Two-collection association cache.
///
/// `localized` holds engine-bound associations, `unlocalized` holds
/// templates. [`resolve`](Self::resolve) searches localized entries
/// first; on a template hit it derives keys for the given engine and
/// inserts the new association at the *front* of `localized`, so the
/// most recently localized entry wins ties among duplicate usernames.
#[derive(Debug, Default)]
pub struct UserCache {
    localized: Vec<UserAssociation>,
    unlocalized: Vec<UserAssociation>,
}

impl UserCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the cache from a credential configuration.
    ///
    /// Both collections are replaced wholesale; the cache is never
    /// patched incrementally on configuration changes.
    pub fn rebuild(&mut self, rows: &[UsmUserConfig]) {
        self.localized.clear();
        self.unlocalized.clear();

        for row in rows {
            let assoc = UserAssociation::from_config(row.clone());
            if assoc.engine_id.is_empty() {
                self.unlocalized.insert(0, assoc);
            } else {
                self.localized.insert(0, assoc);
            }
        }
    }

    /// Find the association for (engine id, username), localizing a
    /// template on first use.
    ///
    /// Returns `None` when no configured user matches.
    pub fn resolve(&mut self, engine_id: &[u8], user_name: &[u8]) -> Option<&UserAssociation> {
        if let Some(i) = self.localized.iter().position(|a| {
            cache_eq(a.user_name(), user_name) && cache_eq(a.engine_id(), engine_id)
        }) {
            return Some(&self.localized[i]);
        }

        if let Some(i) = self
            .unlocalized
            .iter()
            .position(|a| cache_eq(a.user_name(), user_name))
        {
            let localized = self.unlocalized[i].localize(engine_id);
            self.localized.insert(0, localized);
            return Some(&self.localized[0]);
        }

        None
    }

    /// Number of engine-bound associations currently cached.
    pub fn localized_len(&self) -> usize {
        self.localized.len()
    }

    /// Number of templates awaiting localization.
    pub fn unlocalized_len(&self) -> usize {
        self.unlocalized.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENGINE_A: &[u8] = &[0x80, 0x00, 0x1F, 0x88, 0x01, 10, 0, 0, 1];
    const ENGINE_B: &[u8] = &[0x80, 0x00, 0x1F, 0x88, 0x01, 10, 0, 0, 2];

    fn template(name: &[u8]) -> UsmUserConfig {
        UsmUserConfig::new(
            name,
            AuthProtocol::Sha1,
            b"authpassword".as_slice(),
            PrivProtocol::Aes,
            b"privpassword".as_slice(),
        )
    }

    #[test]
    fn test_rebuild_sorts_rows_into_collections() {
        let mut cache = UserCache::new();
        cache.rebuild(&[
            template(b"alice"),
            template(b"bob").with_engine_id(ENGINE_A),
        ]);

        assert_eq!(cache.unlocalized_len(), 1);
        assert_eq!(cache.localized_len(), 1);
    }

    #[test]
    fn test_prelocalized_row_has_keys() {
        let mut cache = UserCache::new();
        cache.rebuild(&[template(b"bob").with_engine_id(ENGINE_A)]);

        let assoc = cache.resolve(ENGINE_A, b"bob").unwrap();
        assert_eq!(assoc.auth_key().unwrap().as_bytes().len(), 20);
        assert_eq!(assoc.engine_id(), ENGINE_A);
    }

    #[test]
    fn test_lazy_localization_happens_once() {
        let mut cache = UserCache::new();
        cache.rebuild(&[template(b"alice")]);
        assert_eq!(cache.localized_len(), 0);

        let first = cache.resolve(ENGINE_A, b"alice").unwrap();
        let first_key = first.auth_key().unwrap().as_bytes().to_vec();
        assert_eq!(cache.localized_len(), 1);

        // Second resolve hits the cached association: no new entry,
        // byte-identical key
        let second = cache.resolve(ENGINE_A, b"alice").unwrap();
        assert_eq!(second.auth_key().unwrap().as_bytes(), &first_key[..]);
        assert_eq!(cache.localized_len(), 1);
    }

    #[test]
    fn test_distinct_engines_localize_separately() {
        let mut cache = UserCache::new();
        cache.rebuild(&[template(b"alice")]);

        let key_a = cache
            .resolve(ENGINE_A, b"alice")
            .unwrap()
            .auth_key()
            .unwrap()
            .as_bytes()
            .to_vec();
        let key_b = cache
            .resolve(ENGINE_B, b"alice")
            .unwrap()
            .auth_key()
            .unwrap()
            .as_bytes()
            .to_vec();

        assert_ne!(key_a, key_b);
        assert_eq!(cache.localized_len(), 2);
    }

    #[test]
    fn test_unknown_user_is_none() {
        let mut cache = UserCache::new();
        cache.rebuild(&[template(b"alice")]);
        assert!(cache.resolve(ENGINE_A, b"mallory").is_none());
    }

    #[test]
    fn test_length_mismatch_never_matches() {
        let mut cache = UserCache::new();
        cache.rebuild(&[template(b"alice")]);
        // Prefix of a configured name is not a match
        assert!(cache.resolve(ENGINE_A, b"ali").is_none());
        assert!(cache.resolve(ENGINE_A, b"alice2").is_none());
    }

    #[test]
    fn test_front_insertion_most_recent_wins() {
        // Two templates with the same username but different passwords
        let mut rows = vec![template(b"alice")];
        let mut other = template(b"alice");
        other.auth_password = b"otherpassword".to_vec();
        rows.push(other);

        let mut cache = UserCache::new();
        cache.rebuild(&rows);

        // rebuild inserts at the front, so the later row is scanned first
        let resolved = cache.resolve(ENGINE_A, b"alice").unwrap();
        let expected = AuthKey::from_password(AuthProtocol::Sha1, b"otherpassword", ENGINE_A);
        assert_eq!(resolved.auth_key().unwrap().as_bytes(), expected.as_bytes());
    }

    #[test]
    fn test_rebuild_replaces_everything() {
        let mut cache = UserCache::new();
        cache.rebuild(&[template(b"alice")]);
        cache.resolve(ENGINE_A, b"alice").unwrap();
        assert_eq!(cache.localized_len(), 1);

        cache.rebuild(&[template(b"bob")]);
        assert_eq!(cache.localized_len(), 0);
        assert_eq!(cache.unlocalized_len(), 1);
        assert!(cache.resolve(ENGINE_A, b"alice").is_none());
    }

    #[test]
    fn test_validate_advisories() {
        let mut row = template(b"");
        row.auth_password = b"short".to_vec();
        let issues = row.validate();
        assert!(issues.contains(&ConfigIssue::EmptyUserName));
        assert!(issues.contains(&ConfigIssue::ShortAuthPassword { len: 5 }));
        // priv password is fine
        assert_eq!(issues.len(), 2);
    }

    #[test]
    fn test_priv_key_sized_by_auth_digest() {
        let mut cache = UserCache::new();
        let mut row = template(b"alice");
        row.priv_protocol = PrivProtocol::Des;
        cache.rebuild(&[row]);

        let assoc = cache.resolve(ENGINE_A, b"alice").unwrap();
        // SHA1 auth: both keys are 20 bytes even though DES needs 16
        assert_eq!(assoc.auth_key().unwrap().as_bytes().len(), 20);
        assert!(assoc.priv_key().is_some());
    }
}
