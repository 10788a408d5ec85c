//! Rotating key list.

use std::str::FromStr;

use base64::{engine::general_purpose::URL_SAFE as BASE64_URL, Engine};
use zeroize::Zeroizing;

use egide_crypto::random::generate_nonce;
use egide_crypto::secretbox::{self, NONCE_SIZE};
use egide_crypto::SecretKey;

use crate::KeyListError;

/// Ordered list of rotation keys, oldest first, newest (current) last.
///
/// Immutable once built and safe to share between threads.
pub struct KeyList {
    keys: Vec<SecretKey>,
}

impl KeyList {
    /// Builds a key list from hex strings, each encoding exactly 32 bytes.
    ///
    /// Order is rotation order: the last key is used for encryption.
    pub fn new<I, S>(list: I) -> Result<Self, KeyListError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keys = list
            .into_iter()
            .enumerate()
            .map(|(index, encoded)| {
                SecretKey::from_hex(encoded.as_ref())
                    .map_err(|e| KeyListError::InvalidFormat(format!("key {index}: {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::from_keys(keys)
    }

    /// Builds a key list from already decoded keys.
    pub fn from_keys(keys: Vec<SecretKey>) -> Result<Self, KeyListError> {
        if keys.is_empty() {
            return Err(KeyListError::EmptyKeyList);
        }
        Ok(Self { keys })
    }

    /// Parses a JSON array of hex-encoded keys.
    ///
    /// ```
    /// use egide_keylist::KeyList;
    ///
    /// let keys = KeyList::from_json(
    ///     r#"["caa9b00e54d3f3c7dc5eb705743a3bc1c0439171112d6bc31b0ca3219ab3889b"]"#,
    /// )
    /// .unwrap();
    /// assert_eq!(keys.len(), 1);
    /// ```
    pub fn from_json(json: &str) -> Result<Self, KeyListError> {
        let list: Zeroizing<Vec<String>> = Zeroizing::new(
            serde_json::from_str(json).map_err(|e| KeyListError::InvalidFormat(e.to_string()))?,
        );
        Self::new(list.iter())
    }

    /// Returns the number of keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Always false for a constructed list; present for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    fn current(&self) -> Result<&SecretKey, KeyListError> {
        self.keys.last().ok_or(KeyListError::EmptyKeyList)
    }

    /// Encrypts a string with the newest key.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, KeyListError> {
        self.encrypt_bytes(plaintext.as_bytes())
    }

    /// Encrypts bytes with the newest key.
    ///
    /// Returns `base64url(nonce || sealed)` with a fresh random nonce.
    pub fn encrypt_bytes(&self, plaintext: &[u8]) -> Result<String, KeyListError> {
        let key = self.current()?;
        let nonce = generate_nonce::<NONCE_SIZE>();
        let sealed = secretbox::seal(key, &nonce, plaintext)?;

        let mut framed = Vec::with_capacity(NONCE_SIZE + sealed.len());
        framed.extend_from_slice(&nonce);
        framed.extend_from_slice(&sealed);

        Ok(BASE64_URL.encode(framed))
    }

    /// Decrypts a string produced by [`encrypt`](Self::encrypt) with any key
    /// in the list.
    pub fn decrypt(&self, ciphertext: &str) -> Result<String, KeyListError> {
        let plaintext = self.decrypt_bytes(ciphertext)?;
        std::str::from_utf8(&plaintext)
            .map(str::to_owned)
            .map_err(|_| KeyListError::InvalidPlaintext)
    }

    /// Decrypts bytes, trying keys oldest first.
    ///
    /// Per-key failures are expected while rotating and are not reported;
    /// only exhaustion is ([`KeyListError::NoMatchingKey`]).
    pub fn decrypt_bytes(&self, ciphertext: &str) -> Result<Zeroizing<Vec<u8>>, KeyListError> {
        if ciphertext.is_empty() {
            return Err(KeyListError::EmptyCiphertext);
        }

        let framed = BASE64_URL
            .decode(ciphertext)
            .map_err(|e| KeyListError::Encoding(e.to_string()))?;

        if framed.len() < NONCE_SIZE {
            return Err(KeyListError::NoMatchingKey);
        }
        let (nonce, sealed) = framed.split_at(NONCE_SIZE);
        let nonce: &[u8; NONCE_SIZE] = nonce
            .try_into()
            .map_err(|_| KeyListError::NoMatchingKey)?;

        self.keys
            .iter()
            .find_map(|key| secretbox::open(key, nonce, sealed).ok())
            .ok_or(KeyListError::NoMatchingKey)
    }
}

impl FromStr for KeyList {
    type Err = KeyListError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_json(s)
    }
}

impl std::fmt::Debug for KeyList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyList")
            .field("keys", &self.keys.len())
            .finish()
    }
}
