//! The node's own identity: signing key plus personal-document address.

use anyhow::Result;
use std::sync::Arc;
use zeroize::Zeroize;

use narrative_core::{PersonalDocument, Profile, TrustExchangeUri};
use narrative_crypto::{sign_profile, KeyPair, LocalSigner, RecordSigner};
use narrative_sync::{DocHandle, Repo};

use crate::replica::StoredRepo;
use crate::storage::Storage;

const SIGNING_KEY: &str = "signing_key";
const DOCUMENT_ADDRESS: &str = "personal_document";

/// A loaded local identity.
pub struct LocalIdentity {
    pub signer: Arc<LocalSigner>,
    pub document: Arc<dyn DocHandle>,
}

impl LocalIdentity {
    pub fn did(&self) -> &str {
        self.signer.did()
    }

    pub fn address(&self) -> &str {
        self.document.address()
    }

    /// The value to hand to someone in person, e.g. as a QR code.
    pub fn exchange_uri(&self) -> Result<TrustExchangeUri> {
        let did = narrative_core::Did::new(self.did())?;
        Ok(TrustExchangeUri::new(did, Some(self.address().to_string())))
    }
}

/// Load the identity from storage, creating the key and the signed personal
/// document on first use.
pub async fn load_or_create(
    storage: &Storage,
    repo: &StoredRepo,
    display_name: Option<String>,
) -> Result<LocalIdentity> {
    let signer = Arc::new(load_or_generate_key(storage)?);

    if let Some(bytes) = storage.get_state(DOCUMENT_ADDRESS)? {
        let address = String::from_utf8(bytes)?;
        let document = repo.find(&address).await?;
        tracing::debug!(did = %signer.did(), address = %address, "identity loaded");
        return Ok(LocalIdentity { signer, document });
    }

    let profile = sign_profile(Profile::new(display_name), signer.as_ref())?;
    let doc = PersonalDocument::new(signer.did(), profile);
    let document = repo.create(doc.to_value()?)?;
    storage.put_state(DOCUMENT_ADDRESS, document.address().as_bytes())?;
    tracing::info!(
        did = %signer.did(),
        address = %document.address(),
        "personal document created"
    );

    Ok(LocalIdentity { signer, document })
}

fn load_or_generate_key(storage: &Storage) -> Result<LocalSigner> {
    if let Some(mut bytes) = storage.get_identity(SIGNING_KEY)? {
        let keypair = KeyPair::from_bytes(&bytes);
        bytes.zeroize();
        return Ok(LocalSigner::new(keypair?));
    }

    let keypair = KeyPair::generate();
    let mut secret = keypair.secret_bytes();
    storage.put_identity(SIGNING_KEY, &secret)?;
    secret.zeroize();
    Ok(LocalSigner::new(keypair))
}
