use pod_types::{Address, Digest, MessageType, Namespace, PublicKey};

/// Longest accepted seed component, in bytes.
pub const MAX_SEED_LEN: usize = 64;
/// Most seed components accepted by one derivation.
pub const MAX_SEEDS: usize = 16;

const ADDRESS_DOMAIN: &[u8] = b"pod-address-v1:";

/// Deterministic address derivation scoped to one ledger program.
///
/// The hash input is `domain || namespace tag || program id || seed count`
/// followed by every seed as `u16 BE length || bytes`. Length prefixes keep
/// `["ab", "c"]` and `["a", "bc"]` apart; the namespace tag keeps entity
/// kinds apart. Pure: no I/O, no state beyond the program id.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AddressDeriver {
    program_id: PublicKey,
}

impl AddressDeriver {
    pub const fn new(program_id: PublicKey) -> Self {
        Self { program_id }
    }

    pub fn program_id(&self) -> &PublicKey {
        &self.program_id
    }

    /// Derive the address for `namespace` and ordered `seeds`.
    pub fn derive(&self, namespace: Namespace, seeds: &[&[u8]]) -> Result<Address, DeriveError> {
        if seeds.len() > MAX_SEEDS {
            return Err(DeriveError::InvalidSeed {
                index: MAX_SEEDS,
                reason: format!("{} seeds exceed the limit of {MAX_SEEDS}", seeds.len()),
            });
        }
        if let Some((index, seed)) = seeds
            .iter()
            .enumerate()
            .find(|(_, seed)| seed.len() > MAX_SEED_LEN)
        {
            return Err(DeriveError::InvalidSeed {
                index,
                reason: format!("{} bytes exceed the limit of {MAX_SEED_LEN}", seed.len()),
            });
        }

        let mut hasher = blake3::Hasher::new();
        hasher.update(ADDRESS_DOMAIN);
        hasher.update(&[namespace.tag()]);
        hasher.update(self.program_id.as_bytes());
        hasher.update(&[seeds.len() as u8]);
        for seed in seeds {
            hasher.update(&(seed.len() as u16).to_be_bytes());
            hasher.update(seed);
        }
        Ok(Address::from_raw(*hasher.finalize().as_bytes()))
    }

    /// Agent account: `[owner]`.
    pub fn agent(&self, owner: &PublicKey) -> Result<Address, DeriveError> {
        self.derive(Namespace::Agent, &[owner.as_ref()])
    }

    /// Channel account: `[creator, name]`.
    pub fn channel(&self, creator: &PublicKey, name: &str) -> Result<Address, DeriveError> {
        self.derive(Namespace::Channel, &[creator.as_ref(), name.as_bytes()])
    }

    /// Direct message: `[sender, recipient, payload digest, message type]`.
    pub fn message(
        &self,
        sender: &PublicKey,
        recipient: &PublicKey,
        payload: &Digest,
        message_type: MessageType,
    ) -> Result<Address, DeriveError> {
        let kind = message_type.seed_bytes();
        self.derive(
            Namespace::Message,
            &[
                sender.as_ref(),
                recipient.as_ref(),
                payload.as_bytes(),
                &kind,
            ],
        )
    }

    /// Channel broadcast message: `[channel, sender, nonce (LE)]`.
    pub fn channel_message(
        &self,
        channel: &Address,
        sender: &PublicKey,
        nonce: u64,
    ) -> Result<Address, DeriveError> {
        self.derive(
            Namespace::Message,
            &[channel.as_ref(), sender.as_ref(), &nonce.to_le_bytes()],
        )
    }

    /// Escrow account: `[channel, depositor]`.
    pub fn escrow(&self, channel: &Address, depositor: &PublicKey) -> Result<Address, DeriveError> {
        self.derive(Namespace::Escrow, &[channel.as_ref(), depositor.as_ref()])
    }

    /// Channel participant: `[channel, agent]`.
    pub fn participant(&self, channel: &Address, agent: &Address) -> Result<Address, DeriveError> {
        self.derive(Namespace::Participant, &[channel.as_ref(), agent.as_ref()])
    }

    /// Channel invitation: `[channel, invitee]`.
    pub fn invitation(
        &self,
        channel: &Address,
        invitee: &PublicKey,
    ) -> Result<Address, DeriveError> {
        self.derive(Namespace::Invitation, &[channel.as_ref(), invitee.as_ref()])
    }
}

/// Errors from address derivation. Always a caller error; never retried.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum DeriveError {
    #[error("invalid seed at position {index}: {reason}")]
    InvalidSeed { index: usize, reason: String },
}
