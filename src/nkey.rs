// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use nkeys::{KeyPair, KeyPairType};
use secrecy::{ExposeSecret as _, SecretString};

use crate::{error::Result, rng};

/// A user NKey: the seed is the private half and never leaves the client; the
/// public key is what the server is configured with.
pub(crate) struct NKeyPair {
    seed: SecretString,
    public_key: String,
}

impl NKeyPair {
    pub(crate) fn generate() -> Result<Self> {
        let kp = KeyPair::new_from_raw(KeyPairType::User, rng::bytes::<32>())?;
        Ok(Self {
            seed: SecretString::new(kp.seed()?),
            public_key: kp.public_key(),
        })
    }

    pub(crate) fn from_seed(seed: &SecretString) -> Result<Self> {
        let kp = KeyPair::from_seed(seed.expose_secret())?;
        Ok(Self {
            seed: seed.clone(),
            public_key: kp.public_key(),
        })
    }

    pub(crate) const fn seed(&self) -> &SecretString {
        &self.seed
    }

    pub(crate) fn public_key(&self) -> &str {
        &self.public_key
    }

    /// Produces the signature a client hands back for a server-issued nonce.
    pub(crate) fn sign(&self, challenge: &[u8]) -> Result<Vec<u8>> {
        let kp = KeyPair::from_seed(self.seed.expose_secret())?;
        Ok(kp.sign(challenge)?)
    }
}

pub(crate) fn verify(public_key: &str, challenge: &[u8], signature: &[u8]) -> Result<()> {
    let kp = KeyPair::from_public_key(public_key)?;
    Ok(kp.verify(challenge, signature)?)
}
