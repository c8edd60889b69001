//! Elliptic-curve domain parameters and group arithmetic for GOST R 34.10-2001.
//!
//! Curves are short Weierstrass `y² = x³ + ax + b (mod p)` with a prime-order
//! subgroup of order `q` generated by `G`. Arithmetic runs in Jacobian
//! coordinates and is normalized to affine form only at the boundaries.
//!
//! The arithmetic is variable-time.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use const_oid::ObjectIdentifier;
use num_bigint::BigUint;
use num_traits::{One, Zero};

use crate::error::{GostCertError, Result};

/// A point on a curve in affine form. `Infinity` is the group identity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Point {
    Infinity,
    Affine { x: BigUint, y: BigUint },
}

#[derive(Clone, Debug)]
struct Jacobian {
    x: BigUint,
    y: BigUint,
    z: BigUint,
}

impl Jacobian {
    fn infinity() -> Self {
        Self {
            x: BigUint::one(),
            y: BigUint::one(),
            z: BigUint::zero(),
        }
    }

    fn is_infinity(&self) -> bool {
        self.z.is_zero()
    }
}

/// Domain parameters of one curve.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Curve {
    /// Field prime.
    pub p: BigUint,
    /// Coefficient `a`.
    pub a: BigUint,
    /// Coefficient `b`.
    pub b: BigUint,
    /// Order of the base point.
    pub q: BigUint,
    /// Base point x coordinate.
    pub gx: BigUint,
    /// Base point y coordinate.
    pub gy: BigUint,
}

fn hex(s: &str) -> BigUint {
    BigUint::parse_bytes(s.as_bytes(), 16).expect("curve constant is valid hex")
}

impl Curve {
    fn from_hex(p: &str, a: &str, b: &str, q: &str, gx: &str, gy: &str) -> Self {
        Self {
            p: hex(p),
            a: hex(a),
            b: hex(b),
            q: hex(q),
            gx: hex(gx),
            gy: hex(gy),
        }
    }

    /// The base point `G`.
    pub fn generator(&self) -> Point {
        Point::Affine {
            x: self.gx.clone(),
            y: self.gy.clone(),
        }
    }

    /// Returns true if `point` satisfies the curve equation. The identity is
    /// not considered a valid member for key purposes.
    pub fn contains(&self, point: &Point) -> bool {
        match point {
            Point::Infinity => false,
            Point::Affine { x, y } => {
                if x >= &self.p || y >= &self.p {
                    return false;
                }
                let lhs = self.mul_mod(y, y);
                let rhs = (self.mul_mod(&self.mul_mod(x, x), x) + self.mul_mod(&self.a, x) + &self.b)
                    % &self.p;
                lhs == rhs
            }
        }
    }

    /// Computes `k·point`.
    pub fn mul(&self, point: &Point, k: &BigUint) -> Point {
        let base = self.to_jacobian(point);
        let mut acc = Jacobian::infinity();
        for i in (0..k.bits()).rev() {
            acc = self.double(&acc);
            if k.bit(i) {
                acc = self.add_jacobian(&acc, &base);
            }
        }
        self.to_affine(&acc)
    }

    /// Computes `k·G`.
    pub fn mul_base(&self, k: &BigUint) -> Point {
        self.mul(&self.generator(), k)
    }

    /// Computes `lhs + rhs`.
    pub fn add(&self, lhs: &Point, rhs: &Point) -> Point {
        let sum = self.add_jacobian(&self.to_jacobian(lhs), &self.to_jacobian(rhs));
        self.to_affine(&sum)
    }

    /// Modular inverse in the field of `modulus`, which must be prime.
    pub(crate) fn invert(value: &BigUint, modulus: &BigUint) -> BigUint {
        value.modpow(&(modulus - 2u32), modulus)
    }

    fn mul_mod(&self, lhs: &BigUint, rhs: &BigUint) -> BigUint {
        (lhs * rhs) % &self.p
    }

    fn sub_mod(&self, lhs: &BigUint, rhs: &BigUint) -> BigUint {
        ((lhs + &self.p) - rhs) % &self.p
    }

    fn to_jacobian(&self, point: &Point) -> Jacobian {
        match point {
            Point::Infinity => Jacobian::infinity(),
            Point::Affine { x, y } => Jacobian {
                x: x % &self.p,
                y: y % &self.p,
                z: BigUint::one(),
            },
        }
    }

    fn to_affine(&self, point: &Jacobian) -> Point {
        if point.is_infinity() {
            return Point::Infinity;
        }
        let z_inv = Self::invert(&point.z, &self.p);
        let z_inv2 = self.mul_mod(&z_inv, &z_inv);
        Point::Affine {
            x: self.mul_mod(&point.x, &z_inv2),
            y: self.mul_mod(&point.y, &self.mul_mod(&z_inv2, &z_inv)),
        }
    }

    fn double(&self, point: &Jacobian) -> Jacobian {
        if point.is_infinity() || point.y.is_zero() {
            return Jacobian::infinity();
        }
        let p = &self.p;
        let xx = self.mul_mod(&point.x, &point.x);
        let yy = self.mul_mod(&point.y, &point.y);
        let yyyy = self.mul_mod(&yy, &yy);
        let zz = self.mul_mod(&point.z, &point.z);

        let s = (&point.x * &yy * 4u32) % p;
        let m = (&xx * 3u32 + self.mul_mod(&self.a, &self.mul_mod(&zz, &zz))) % p;
        let x3 = self.sub_mod(&self.mul_mod(&m, &m), &((&s * 2u32) % p));
        let y3 = self.sub_mod(
            &self.mul_mod(&m, &self.sub_mod(&s, &x3)),
            &((&yyyy * 8u32) % p),
        );
        let z3 = (&point.y * &point.z * 2u32) % p;
        Jacobian {
            x: x3,
            y: y3,
            z: z3,
        }
    }

    fn add_jacobian(&self, lhs: &Jacobian, rhs: &Jacobian) -> Jacobian {
        if lhs.is_infinity() {
            return rhs.clone();
        }
        if rhs.is_infinity() {
            return lhs.clone();
        }
        let z1z1 = self.mul_mod(&lhs.z, &lhs.z);
        let z2z2 = self.mul_mod(&rhs.z, &rhs.z);
        let u1 = self.mul_mod(&lhs.x, &z2z2);
        let u2 = self.mul_mod(&rhs.x, &z1z1);
        let s1 = self.mul_mod(&self.mul_mod(&lhs.y, &rhs.z), &z2z2);
        let s2 = self.mul_mod(&self.mul_mod(&rhs.y, &lhs.z), &z1z1);

        if u1 == u2 {
            return if s1 == s2 {
                self.double(lhs)
            } else {
                Jacobian::infinity()
            };
        }

        let h = self.sub_mod(&u2, &u1);
        let r = self.sub_mod(&s2, &s1);
        let hh = self.mul_mod(&h, &h);
        let hhh = self.mul_mod(&h, &hh);
        let v = self.mul_mod(&u1, &hh);

        let x3 = self.sub_mod(
            &self.sub_mod(&self.mul_mod(&r, &r), &hhh),
            &((&v * 2u32) % &self.p),
        );
        let y3 = self.sub_mod(
            &self.mul_mod(&r, &self.sub_mod(&v, &x3)),
            &self.mul_mod(&s1, &hhh),
        );
        let z3 = self.mul_mod(&self.mul_mod(&lhs.z, &rhs.z), &h);
        Jacobian {
            x: x3,
            y: y3,
            z: z3,
        }
    }
}

/// Named GOST R 34.10-2001 domain-parameter sets (RFC 4357).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DomainParameterSet {
    /// `id-GostR3410-2001-TestParamSet`
    Test,
    /// `id-GostR3410-2001-CryptoPro-A-ParamSet`
    CryptoProA,
    /// `id-GostR3410-2001-CryptoPro-B-ParamSet`
    CryptoProB,
    /// `id-GostR3410-2001-CryptoPro-C-ParamSet`
    CryptoProC,
    /// `id-GostR3410-2001-CryptoPro-XchA-ParamSet`, the curve of CryptoPro-A.
    CryptoProXchA,
    /// `id-GostR3410-2001-CryptoPro-XchB-ParamSet`, the curve of CryptoPro-C.
    CryptoProXchB,
}

impl DomainParameterSet {
    /// Every recognized set.
    pub const ALL: [DomainParameterSet; 6] = [
        DomainParameterSet::Test,
        DomainParameterSet::CryptoProA,
        DomainParameterSet::CryptoProB,
        DomainParameterSet::CryptoProC,
        DomainParameterSet::CryptoProXchA,
        DomainParameterSet::CryptoProXchB,
    ];

    /// The object identifier naming this set.
    pub fn oid(self) -> ObjectIdentifier {
        match self {
            DomainParameterSet::Test => ObjectIdentifier::new_unwrap("1.2.643.2.2.35.0"),
            DomainParameterSet::CryptoProA => ObjectIdentifier::new_unwrap("1.2.643.2.2.35.1"),
            DomainParameterSet::CryptoProB => ObjectIdentifier::new_unwrap("1.2.643.2.2.35.2"),
            DomainParameterSet::CryptoProC => ObjectIdentifier::new_unwrap("1.2.643.2.2.35.3"),
            DomainParameterSet::CryptoProXchA => ObjectIdentifier::new_unwrap("1.2.643.2.2.36.0"),
            DomainParameterSet::CryptoProXchB => ObjectIdentifier::new_unwrap("1.2.643.2.2.36.1"),
        }
    }

    /// The conventional name of this set.
    pub fn name(self) -> &'static str {
        match self {
            DomainParameterSet::Test => "GostR3410-2001-TestParamSet",
            DomainParameterSet::CryptoProA => "GostR3410-2001-CryptoPro-A",
            DomainParameterSet::CryptoProB => "GostR3410-2001-CryptoPro-B",
            DomainParameterSet::CryptoProC => "GostR3410-2001-CryptoPro-C",
            DomainParameterSet::CryptoProXchA => "GostR3410-2001-CryptoPro-XchA",
            DomainParameterSet::CryptoProXchB => "GostR3410-2001-CryptoPro-XchB",
        }
    }

    /// Looks a set up by its object identifier.
    pub fn from_oid(oid: ObjectIdentifier) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|set| set.oid() == oid)
            .ok_or_else(|| {
                GostCertError::ConfigurationError(format!(
                    "Unrecognized domain parameter set OID {oid}"
                ))
            })
    }

    /// Byte length of one coordinate, and of one signature half.
    pub fn coordinate_len(self) -> usize {
        32
    }

    /// The curve behind this set.
    pub fn curve(self) -> &'static Curve {
        static TEST: OnceLock<Curve> = OnceLock::new();
        static CRYPTOPRO_A: OnceLock<Curve> = OnceLock::new();
        static CRYPTOPRO_B: OnceLock<Curve> = OnceLock::new();
        static CRYPTOPRO_C: OnceLock<Curve> = OnceLock::new();

        match self {
            DomainParameterSet::Test => TEST.get_or_init(|| {
                Curve::from_hex(
                    "8000000000000000000000000000000000000000000000000000000000000431",
                    "7",
                    "5FBFF498AA938CE739B8E022FBAFEF40563F6E6A3472FC2A514C0CE9DAE23B7E",
                    "8000000000000000000000000000000150FE8A1892976154C59CFC193ACCF5B3",
                    "2",
                    "08E2A8A0E65147D4BD6316030E16D19C85C97F0A9CA267122B96ABBCEA7E8FC8",
                )
            }),
            DomainParameterSet::CryptoProA | DomainParameterSet::CryptoProXchA => CRYPTOPRO_A
                .get_or_init(|| {
                    Curve::from_hex(
                        "FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFD97",
                        "FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFD94",
                        "A6",
                        "FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFF6C611070995AD10045841B09B761B893",
                        "1",
                        "8D91E471E0989CDA27DF505A453F2B7635294F2DDF23E3B122ACC99C9E9F1E14",
                    )
                }),
            DomainParameterSet::CryptoProB => CRYPTOPRO_B.get_or_init(|| {
                Curve::from_hex(
                    "8000000000000000000000000000000000000000000000000000000000000C99",
                    "8000000000000000000000000000000000000000000000000000000000000C96",
                    "3E1AF419A269A5F866A7D3C25C3DF80AE979259373FF2B182F49D4CE7E1BBC8B",
                    "800000000000000000000000000000015F700CFFF1A624E5E497161BCC8A198F",
                    "1",
                    "3FA8124359F96680B83D1C3EB2C070E5C545C9858D03ECFB744BF8D717717EFC",
                )
            }),
            DomainParameterSet::CryptoProC | DomainParameterSet::CryptoProXchB => CRYPTOPRO_C
                .get_or_init(|| {
                    Curve::from_hex(
                        "9B9F605F5A858107AB1EC85E6B41C8AACF846E86789051D37998F7B9022D759B",
                        "9B9F605F5A858107AB1EC85E6B41C8AACF846E86789051D37998F7B9022D7598",
                        "805A",
                        "9B9F605F5A858107AB1EC85E6B41C8AA582CA3511EDDFB74F02F3A6598980BB9",
                        "0",
                        "41ECE55743711A8C3CBF3783CD08C0EE4D4DC440D4641A8F366E550DFDB3BB67",
                    )
                }),
        }
    }
}

impl fmt::Display for DomainParameterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DomainParameterSet {
    type Err = GostCertError;

    /// Accepts the conventional name (with or without the `id-` prefix and
    /// `-ParamSet` suffix, case-insensitive) or a dotted OID.
    fn from_str(s: &str) -> Result<Self> {
        if let Ok(oid) = ObjectIdentifier::new(s) {
            return Self::from_oid(oid);
        }
        let wanted = normalize_name(s);
        Self::ALL
            .into_iter()
            .find(|set| normalize_name(set.name()) == wanted)
            .ok_or_else(|| {
                GostCertError::ConfigurationError(format!(
                    "Unrecognized domain parameter set '{s}'"
                ))
            })
    }
}

fn normalize_name(name: &str) -> String {
    let lower = name.trim().to_ascii_lowercase();
    let lower = lower.strip_prefix("id-").unwrap_or(&lower);
    let lower = lower.strip_suffix("-paramset").unwrap_or(lower);
    lower.replace("paramset", "")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn big(s: &str) -> BigUint {
        hex(s)
    }

    #[test]
    fn test_generators_are_on_their_curves() {
        for set in DomainParameterSet::ALL {
            let curve = set.curve();
            assert!(curve.contains(&curve.generator()), "{set}");
        }
    }

    #[test]
    fn test_generator_has_order_q() {
        for set in [
            DomainParameterSet::Test,
            DomainParameterSet::CryptoProA,
            DomainParameterSet::CryptoProB,
            DomainParameterSet::CryptoProC,
        ] {
            let curve = set.curve();
            assert_eq!(curve.mul_base(&curve.q), Point::Infinity, "{set}");
        }
    }

    #[test]
    fn test_double_matches_addition() {
        let curve = DomainParameterSet::CryptoProB.curve();
        let g = curve.generator();
        let two_g = curve.add(&g, &g);
        assert_eq!(two_g, curve.mul_base(&BigUint::from(2u32)));
        let three_g = curve.add(&two_g, &g);
        assert_eq!(three_g, curve.mul_base(&BigUint::from(3u32)));
        assert!(curve.contains(&three_g));
    }

    #[test]
    fn test_adding_negation_gives_infinity() {
        let curve = DomainParameterSet::CryptoProA.curve();
        let neg_g = Point::Affine {
            x: curve.gx.clone(),
            y: &curve.p - &curve.gy,
        };
        assert_eq!(curve.add(&curve.generator(), &neg_g), Point::Infinity);
    }

    #[test]
    fn test_public_key_known_answer() {
        // GOST R 34.10-2001 worked example on the test parameter set.
        let curve = DomainParameterSet::Test.curve();
        let d = big("7A929ADE789BB9BE10ED359DD39A72C11B60961F49397EEE1D19CE9891EC3B28");
        let expected = Point::Affine {
            x: big("7F2B49E270DB6D90D8595BEC458B50C58585BA1D4E9B788F6689DBD8E56FD80B"),
            y: big("26F1B489D6701DD185C8413A977B3CBBAF64D1C593D26627DFFB101A87FF77DA"),
        };
        assert_eq!(curve.mul_base(&d), expected);
    }

    #[test]
    fn test_parse_parameter_set_names() {
        assert_eq!(
            "GostR3410-2001-CryptoPro-B".parse::<DomainParameterSet>().unwrap(),
            DomainParameterSet::CryptoProB
        );
        assert_eq!(
            "id-GostR3410-2001-CryptoPro-B-ParamSet"
                .parse::<DomainParameterSet>()
                .unwrap(),
            DomainParameterSet::CryptoProB
        );
        assert_eq!(
            "1.2.643.2.2.35.1".parse::<DomainParameterSet>().unwrap(),
            DomainParameterSet::CryptoProA
        );
        assert_eq!(
            "gostr3410-2001-testparamset"
                .parse::<DomainParameterSet>()
                .unwrap(),
            DomainParameterSet::Test
        );
    }

    #[test]
    fn test_unknown_parameter_set_is_configuration_error() {
        let err = "secp256r1".parse::<DomainParameterSet>().unwrap_err();
        assert!(matches!(err, GostCertError::ConfigurationError(_)));
        let err = "1.2.840.10045.3.1.7".parse::<DomainParameterSet>().unwrap_err();
        assert!(matches!(err, GostCertError::ConfigurationError(_)));
    }
}
