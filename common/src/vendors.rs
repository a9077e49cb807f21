use pnet::util::MacAddr;

/// Maps a hardware address to the manufacturer registered for its OUI.
pub trait VendorRepository: Send + Sync {
    fn get_vendor(&self, mac: MacAddr) -> Option<String>;
}
