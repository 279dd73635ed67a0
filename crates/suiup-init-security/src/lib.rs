mod checksum;
mod hasher;
mod verify;

pub use checksum::{parse_checksum, ChecksumAlgorithm, ChecksumParseError, ChecksumRecord};
pub use hasher::{
    default_hash_providers, md5_reader_hex, sha256_hex, sha256_reader_hex, BuiltinHasher,
    ExternalHasher, HashProvider,
};
pub use verify::{
    IntegrityVerifier, SkipReason, VerificationOutcome, VerificationRequest, SKIP_ENV_VAR,
};

#[cfg(test)]
mod tests;
