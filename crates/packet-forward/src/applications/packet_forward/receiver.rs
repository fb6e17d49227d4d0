use sha2::{Digest, Sha256};

use super::error::Error;
use super::MODULE_NAME;
use crate::core::ics24_host::identifier::ChannelId;
use crate::signer::Signer;

/// The account that receives a forwarded transfer on this chain on behalf of
/// `original_sender`, who sent it over `channel_id`.
///
/// The address is `sha256(sha256(module name) || "{channel}/{sender}")`
/// truncated to 20 bytes. Existing deployments derive the same address.
pub fn get_receiver(
    address_prefix: &str,
    channel_id: &ChannelId,
    original_sender: &str,
) -> Result<Signer, Error> {
    let sender = format!("{}/{}", channel_id, original_sender);

    let mut hasher = Sha256::new();
    hasher.update(Sha256::digest(MODULE_NAME.as_bytes()));
    hasher.update(sender.as_bytes());

    let mut hash = hasher.finalize().to_vec();
    hash.truncate(20);

    Signer::from_address_bytes(address_prefix, &hash).map_err(Error::override_receiver)
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::get_receiver;
    use crate::core::ics24_host::identifier::ChannelId;

    const SENDER: &str = "cosmos1wnlew8ss0sqclfalvj6jkcyvnwq79fd74qxxue";
    const INTERMEDIATE: &str = "cosmos1v954djef63x2lqj8yy7r3r487heg0exdmkj0sr";
    const INTERMEDIATE_2: &str = "cosmos1eadmq78mkhg6lrk87lxgateketvz44crq45jpe";

    #[test]
    fn derived_receivers() {
        let channel = ChannelId::new(11);

        let intermediate = get_receiver("cosmos", &channel, SENDER).unwrap();
        assert_eq!(intermediate.as_str(), INTERMEDIATE);

        // the derivation chains for every hop that goes through the same channel
        let intermediate_2 = get_receiver("cosmos", &channel, intermediate.as_str()).unwrap();
        assert_eq!(intermediate_2.as_str(), INTERMEDIATE_2);

        assert_ne!(
            get_receiver("cosmos", &ChannelId::new(12), SENDER).unwrap(),
            intermediate
        );
    }

    #[test]
    fn invalid_prefix() {
        let err = get_receiver("", &ChannelId::new(11), SENDER).unwrap_err();
        assert!(err.message().starts_with("failed to construct override receiver"));
    }
}
