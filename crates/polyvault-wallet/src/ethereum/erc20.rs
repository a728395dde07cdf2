//! ERC-20 `transfer(address,uint256)` call data.

/// First four bytes of `keccak256("transfer(address,uint256)")`.
pub const TRANSFER_SELECTOR: [u8; 4] = [0xa9, 0x05, 0x9c, 0xbb];

/// `selector ‖ pad32(recipient) ‖ pad32(amount)`.
pub fn transfer_data(recipient: &[u8; 20], amount: u128) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + 32 + 32);
    data.extend_from_slice(&TRANSFER_SELECTOR);
    data.extend_from_slice(&[0u8; 12]);
    data.extend_from_slice(recipient);
    data.extend_from_slice(&[0u8; 16]);
    data.extend_from_slice(&amount.to_be_bytes());
    data
}
