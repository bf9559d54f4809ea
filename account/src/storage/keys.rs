//! Well-known account store keys.
//!
//! These names are the on-disk contract with every other component that
//! reads the account store, so they are spelled exactly as those readers
//! expect, including the inconsistent casing.

/// The account's `StoredIdentityKeyPair`.
pub const IDENTITY_KEY: &str = "identityKey";
/// Legacy signaling key. Only ever removed.
pub const SIGNALING_KEY: &str = "signaling_key";
/// Local subsystem password.
pub const PASSWORD: &str = "password";
/// Legacy registration id. Only ever removed.
pub const REGISTRATION_ID: &str = "registrationId";
/// `<account id>.1`, written last when an identity is created.
pub const NUMBER_ID: &str = "number_id";
/// Legacy device name. Only ever removed.
pub const DEVICE_NAME: &str = "device_name";
/// Legacy user agent. Only ever removed.
pub const USER_AGENT: &str = "userAgent";
/// Account id of the primary device.
pub const PRIMARY_DEVICE_PUB_KEY: &str = "primaryDevicePubKey";
/// Read receipts setting.
pub const SETTINGS_READ_RECEIPT: &str = "read-receipt-setting";
/// Typing indicators setting.
pub const SETTINGS_TYPING_INDICATOR: &str = "typing-indicators-setting";
/// Community message pruning setting.
pub const SETTINGS_OPENGROUP_PRUNING: &str = "prune-setting";
/// Legacy region code. Only ever removed.
pub const REGION_CODE: &str = "regionCode";
/// Attachment encryption key. Only ever removed.
pub const LOCAL_ATTACHMENT_ENCRYPTED_KEY: &str = "local_attachment_encrypted_key";

/// The recovery phrase.
pub const MNEMONIC: &str = "mnemonic";
/// Set while a device is being linked from an existing account.
pub const SIGN_IN_BY_LINKING: &str = "isSignInByLinking";
/// Set once a registration has ever completed on this install.
pub const REGISTRATION_DONE_EVER: &str = "chromiumRegistrationDoneEver";
/// Set when the current identity is registered.
pub const REGISTRATION_DONE: &str = "chromiumRegistrationDone";
/// Set once multi-device config sync has been initialized.
pub const CONFIG_SYNC_INITIALIZED: &str = "configSyncInitialized";

/// Everything an old identity may have left behind. Removed before a new
/// identity is written.
pub const IDENTITY_RESET_KEYS: &[&str] = &[
    IDENTITY_KEY,
    SIGNALING_KEY,
    PASSWORD,
    REGISTRATION_ID,
    NUMBER_ID,
    DEVICE_NAME,
    USER_AGENT,
    PRIMARY_DEVICE_PUB_KEY,
    SETTINGS_READ_RECEIPT,
    SETTINGS_TYPING_INDICATOR,
    SETTINGS_OPENGROUP_PRUNING,
    REGION_CODE,
    LOCAL_ATTACHMENT_ENCRYPTED_KEY,
    MNEMONIC,
    REGISTRATION_DONE,
    CONFIG_SYNC_INITIALIZED,
];
