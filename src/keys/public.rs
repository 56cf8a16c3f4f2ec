// Copyright 2019 Stichting Organism
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Schnorr Public Key generation,

use crate::keys::SecretKey;
use crate::SchnorrError;
use curve25519_dalek::{
    ristretto::{CompressedRistretto, RistrettoPoint},
    scalar::Scalar,
};
use std::fmt::Debug;

/// The length of a Ristretto Schnorr `PublicKey`, in bytes.
pub const PUBLIC_KEY_LENGTH: usize = 32;

/// An Schnorr public key.
///
/// Keeps the compressed form next to the point so that transcripts and
/// hashing never recompress, and arithmetic never decompresses.
#[derive(Copy, Clone, Default)]
pub struct PublicKey {
    compressed: CompressedRistretto,
    point: RistrettoPoint,
}

impl Debug for PublicKey {
    fn fmt(&self, f: &mut ::core::fmt::Formatter) -> ::core::fmt::Result {
        write!(f, "PublicKey( {} )", hex::encode(self.compressed.as_bytes()))
    }
}

impl PublicKey {
    const DESCRIPTION: &'static str = "A Ristretto Schnorr public key as 32 bytes.";

    /// Access the compressed Ristretto form
    pub fn as_compressed(&self) -> &CompressedRistretto {
        &self.compressed
    }

    /// Extract the compressed Ristretto form
    pub fn into_compressed(self) -> CompressedRistretto {
        self.compressed
    }

    /// Access the point form
    pub fn as_point(&self) -> &RistrettoPoint {
        &self.point
    }

    /// Extract the point form
    pub fn into_point(self) -> RistrettoPoint {
        self.point
    }

    /// Decompress into the `PublicKey` format that also retains the
    /// compressed form.
    pub fn from_compressed(compressed: CompressedRistretto) -> Result<PublicKey, SchnorrError> {
        match compressed.decompress() {
            None => Err(SchnorrError::PointDecompressionError),
            Some(point) => Ok(PublicKey { compressed, point }),
        }
    }

    /// Compress into the `PublicKey` format that also retains the
    /// uncompressed form.
    pub fn from_point(point: RistrettoPoint) -> PublicKey {
        PublicKey {
            compressed: point.compress(),
            point,
        }
    }

    /// Convert this public key to a byte array.
    #[inline]
    pub fn to_bytes(&self) -> [u8; PUBLIC_KEY_LENGTH] {
        self.compressed.to_bytes()
    }

    /// View this public key as a byte array.
    #[inline]
    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_LENGTH] {
        self.compressed.as_bytes()
    }

    /// Construct a `PublicKey` from a slice of bytes.
    ///
    /// # Returns
    ///
    /// A `Result` whose okay value is an Schnorr `PublicKey` or whose error value
    /// is an `SchnorrError` describing the error that occurred.
    #[inline]
    pub fn from_bytes(bytes: &[u8]) -> Result<PublicKey, SchnorrError> {
        if bytes.len() != PUBLIC_KEY_LENGTH {
            return Err(SchnorrError::SerError);
        }
        let mut bits = [0u8; PUBLIC_KEY_LENGTH];
        bits.copy_from_slice(bytes);
        PublicKey::from_compressed(CompressedRistretto(bits))
    }

    /// Derive this public key from its corresponding `SecretKey`.
    pub fn from_secret(secret_key: &SecretKey) -> PublicKey {
        Self::from_secret_uncompressed(secret_key.as_scalar())
    }

    /// Helper Function to convert [Scalar] into PubKey
    pub(crate) fn from_secret_uncompressed(privkey: &Scalar) -> PublicKey {
        PublicKey::from_point(RistrettoPoint::mul_base(privkey))
    }
}

impl From<&SecretKey> for PublicKey {
    fn from(source: &SecretKey) -> PublicKey {
        PublicKey::from_secret(source)
    }
}

impl PartialEq for PublicKey {
    fn eq(&self, other: &PublicKey) -> bool {
        // Although this is slower than `self.compressed == other.compressed`, expanded point comparison is an equal
        // time comparision
        self.as_point() == other.as_point()
    }
}

impl Eq for PublicKey {}

serde_boilerplate!(PublicKey);

#[cfg(test)]
mod test {
    use super::*;
    use crate::Keypair;
    use rand::SeedableRng;
    use rand_chacha::ChaChaRng;

    #[test]
    fn bytes_round_trip() {
        let keypair = Keypair::generate(&mut ChaChaRng::from_seed([7u8; 32]));
        let decoded = PublicKey::from_bytes(keypair.public.as_bytes()).unwrap();

        assert_eq!(decoded, keypair.public);
    }

    #[test]
    fn rejects_short_and_invalid_encodings() {
        assert_eq!(PublicKey::from_bytes(&[0u8; 31]), Err(SchnorrError::SerError));
        // 0xff.. is not a canonical field element, so it never decompresses.
        assert_eq!(
            PublicKey::from_bytes(&[0xffu8; 32]),
            Err(SchnorrError::PointDecompressionError)
        );
    }
}
