use ndns_types::tlv::{ConsumableBuffer, WritableBuffer};
use ndns_types::{Error, Name};

use crate::error::CryptoError;
use crate::Signer;

const TLV_CERTIFICATE: u64 = 20;
const TLV_PUBLIC_KEY: u64 = 21;
const TLV_SIGNATURE: u64 = 22;

/// A certificate: a signed statement binding `key_name`'s public key,
/// issued by `issuer`. This is the CERT/APPCERT rrdata's inner structure
/// (spec §4.4, §4.7); how it is wrapped into an `Rrset` is
/// `ndns-server::factory`'s job.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Certificate {
    /// The certificate's own name, e.g. `/net/example/DSK-3/KEY/<ksk>/...`.
    pub name: Name,
    /// The identity this certificate vouches for.
    pub key_name: Name,
    pub public_key: Vec<u8>,
    /// The name of the key that signed this certificate. For a root zone's
    /// KSK certificate this is `key_name` itself (spec §9's self-signed
    /// root bootstrap).
    pub issuer: Name,
    pub signature: Vec<u8>,
}

impl Certificate {
    /// The bytes a signature is computed over: the certified key's name
    /// followed by its public key. This is a simplification of a real
    /// certificate's to-be-signed encoding, but it is what both signing and
    /// verification use consistently, so it holds together end to end.
    pub fn to_be_signed(key_name: &Name, public_key: &[u8]) -> Vec<u8> {
        let mut buf = key_name.to_octets();
        buf.extend_from_slice(public_key);
        buf
    }

    pub fn is_self_signed(&self) -> bool {
        self.issuer == self.key_name
    }

    /// Issues a certificate for `key_name`/`public_key`, signed by
    /// `issuer_key_name` via `signer`.
    pub fn issue(
        name: Name,
        key_name: Name,
        public_key: Vec<u8>,
        issuer_key_name: Name,
        signer: &dyn Signer,
    ) -> Result<Certificate, CryptoError> {
        let tbs = Self::to_be_signed(&key_name, &public_key);
        let signature = signer.sign(&issuer_key_name, &tbs)?;
        Ok(Certificate {
            name,
            key_name,
            public_key,
            issuer: issuer_key_name,
            signature,
        })
    }

    /// Verifies this certificate's signature against the given issuer
    /// public key. Does not check anything about trust (whether the
    /// issuer itself is trusted) — that is the resolver's validator's job.
    pub fn verify_signature(&self, issuer_public_key: &[u8]) -> Result<(), CryptoError> {
        let tbs = Self::to_be_signed(&self.key_name, &self.public_key);
        let unparsed_key =
            ring::signature::UnparsedPublicKey::new(&ring::signature::ED25519, issuer_public_key);
        unparsed_key
            .verify(&tbs, &self.signature)
            .map_err(|_| CryptoError::VerificationFailed)
    }

    /// The wire encoding of a certificate, carried as `KEY` rrdata (spec
    /// §4.4, §6): `name`, `key_name`, and `issuer` each encode as a `Name`
    /// TLV, in that fixed order, with `public_key` and `signature` as plain
    /// octet TLVs either side of `issuer`.
    pub fn encode(&self, buffer: &mut WritableBuffer) {
        let mut inner = WritableBuffer::default();
        self.name.encode(&mut inner);
        self.key_name.encode(&mut inner);
        inner.write_tlv(TLV_PUBLIC_KEY, &self.public_key);
        self.issuer.encode(&mut inner);
        inner.write_tlv(TLV_SIGNATURE, &self.signature);
        buffer.write_tlv(TLV_CERTIFICATE, &inner.octets);
    }

    pub fn to_octets(&self) -> Vec<u8> {
        let mut buffer = WritableBuffer::default();
        self.encode(&mut buffer);
        buffer.octets
    }

    pub fn decode(buffer: &mut ConsumableBuffer) -> Result<Self, Error> {
        let (typ, value) = buffer.next_tlv().ok_or(Error::BufferTooShort)?;
        if typ != TLV_CERTIFICATE {
            return Err(Error::UnexpectedTlvType {
                expected: TLV_CERTIFICATE,
                actual: typ,
            });
        }
        let mut inner = ConsumableBuffer::new(value);
        let name = Name::decode(&mut inner)?;
        let key_name = Name::decode(&mut inner)?;
        let (pk_typ, pk_value) = inner.next_tlv().ok_or(Error::BufferTooShort)?;
        if pk_typ != TLV_PUBLIC_KEY {
            return Err(Error::UnexpectedTlvType {
                expected: TLV_PUBLIC_KEY,
                actual: pk_typ,
            });
        }
        let issuer = Name::decode(&mut inner)?;
        let (sig_typ, sig_value) = inner.next_tlv().ok_or(Error::BufferTooShort)?;
        if sig_typ != TLV_SIGNATURE {
            return Err(Error::UnexpectedTlvType {
                expected: TLV_SIGNATURE,
                actual: sig_typ,
            });
        }
        Ok(Certificate {
            name,
            key_name,
            public_key: pk_value.to_vec(),
            issuer,
            signature: sig_value.to_vec(),
        })
    }

    pub fn from_octets(octets: &[u8]) -> Result<Self, Error> {
        let mut cbuf = ConsumableBuffer::new(octets);
        let cert = Self::decode(&mut cbuf)?;
        if !cbuf.is_empty() {
            return Err(Error::TrailingOctets);
        }
        Ok(cert)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryKeychain;

    #[test]
    fn issue_and_verify_roundtrip() {
        let keychain = InMemoryKeychain::new();
        let ksk_name = Name::from_labels(&["net", "example", "KSK-1"]);
        let ksk_public = keychain.generate_key(ksk_name.clone()).unwrap();

        let dsk_name = Name::from_labels(&["net", "example", "DSK-1"]);
        let dsk_public = keychain.generate_key(dsk_name.clone()).unwrap();

        let cert_name = Name::from_labels(&["net", "example", "DSK-1", "KEY"]);
        let cert = Certificate::issue(
            cert_name,
            dsk_name,
            dsk_public,
            ksk_name,
            &keychain,
        )
        .unwrap();

        assert!(!cert.is_self_signed());
        assert!(cert.verify_signature(&ksk_public).is_ok());
    }

    #[test]
    fn tampered_signature_is_rejected() {
        let keychain = InMemoryKeychain::new();
        let ksk_name = Name::from_labels(&["net", "example", "KSK-1"]);
        let ksk_public = keychain.generate_key(ksk_name.clone()).unwrap();

        let dsk_name = Name::from_labels(&["net", "example", "DSK-1"]);
        let dsk_public = keychain.generate_key(dsk_name.clone()).unwrap();

        let mut cert = Certificate::issue(
            Name::from_labels(&["net", "example", "DSK-1", "KEY"]),
            dsk_name,
            dsk_public,
            ksk_name,
            &keychain,
        )
        .unwrap();
        cert.signature[0] ^= 0xFF;

        assert_eq!(
            Err(CryptoError::VerificationFailed),
            cert.verify_signature(&ksk_public)
        );
    }

    #[test]
    fn self_signed_root_cert() {
        let keychain = InMemoryKeychain::new();
        let ksk_name = Name::root().append_label("KSK-1");
        let ksk_public = keychain.generate_key(ksk_name.clone()).unwrap();

        let cert = Certificate::issue(
            Name::root().append_label("KSK-1").append_label("KEY"),
            ksk_name.clone(),
            ksk_public.clone(),
            ksk_name,
            &keychain,
        )
        .unwrap();

        assert!(cert.is_self_signed());
        assert!(cert.verify_signature(&ksk_public).is_ok());
    }

    #[test]
    fn wire_roundtrip() {
        let keychain = InMemoryKeychain::new();
        let ksk_name = Name::from_labels(&["net", "example", "KSK-1"]);
        let ksk_public = keychain.generate_key(ksk_name.clone()).unwrap();

        let dsk_name = Name::from_labels(&["net", "example", "DSK-1"]);
        let dsk_public = keychain.generate_key(dsk_name.clone()).unwrap();

        let cert = Certificate::issue(
            Name::from_labels(&["net", "example", "DSK-1", "KEY"]),
            dsk_name,
            dsk_public,
            ksk_name,
            &keychain,
        )
        .unwrap();

        let octets = cert.to_octets();
        assert_eq!(cert, Certificate::from_octets(&octets).unwrap());
    }
}
