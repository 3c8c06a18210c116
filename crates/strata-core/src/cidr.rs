//! Subnet carving for `Fn::Cidr`.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::eval::EvalError;

/// Largest number of subnets a single `Fn::Cidr` call may produce.
const MAX_COUNT: i64 = 256;

/// Carves `count` consecutive subnets with `bits` host bits each out of `block`.
///
/// `"10.0.0.0/16", 3, 8` yields `10.0.0.0/24`, `10.0.1.0/24`, `10.0.2.0/24`.
pub fn subnets(block: &str, count: i64, bits: i64) -> Result<Vec<String>, EvalError> {
    let invalid = |reason: &str| EvalError::InvalidCidr {
        block: block.to_string(),
        reason: reason.to_string(),
    };

    let (address, prefix) = block
        .split_once('/')
        .ok_or_else(|| invalid("missing prefix length"))?;
    let prefix: u32 = prefix
        .trim()
        .parse()
        .map_err(|_| invalid("prefix length is not a number"))?;
    let address: IpAddr = address
        .trim()
        .parse()
        .map_err(|_| invalid("malformed address"))?;

    let (base, width) = match address {
        IpAddr::V4(v4) => (u128::from(u32::from(v4)), 32u32),
        IpAddr::V6(v6) => (u128::from(v6), 128u32),
    };

    if prefix > width {
        return Err(invalid("prefix length exceeds address width"));
    }
    if !(1..=MAX_COUNT).contains(&count) {
        return Err(invalid("subnet count must be between 1 and 256"));
    }
    let bits = u32::try_from(bits).map_err(|_| invalid("subnet bits must be positive"))?;
    if bits == 0 || bits >= width || bits > width - prefix {
        return Err(invalid("subnet bits do not fit the block"));
    }

    let available_exponent = width - prefix - bits;
    let available = 1u128.checked_shl(available_exponent).unwrap_or(u128::MAX);
    let count = count as u128;
    if count > available {
        return Err(invalid("block is too small for the requested subnets"));
    }

    let full = if width == 128 {
        u128::MAX
    } else {
        (1u128 << width) - 1
    };
    let mask = if prefix == 0 {
        0
    } else {
        (full << (width - prefix)) & full
    };
    let network = base & mask;
    let subnet_prefix = width - bits;

    Ok((0..count)
        .map(|i| {
            let start = network + (i << bits);
            let address = match address {
                IpAddr::V4(_) => IpAddr::V4(Ipv4Addr::from(start as u32)),
                IpAddr::V6(_) => IpAddr::V6(Ipv6Addr::from(start)),
            };
            format!("{address}/{subnet_prefix}")
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ipv4_subnets() {
        assert_eq!(
            subnets("10.0.0.0/16", 3, 8).unwrap(),
            vec!["10.0.0.0/24", "10.0.1.0/24", "10.0.2.0/24"]
        );
    }

    #[test]
    fn test_host_bits_are_masked() {
        assert_eq!(
            subnets("192.168.1.77/24", 2, 6).unwrap(),
            vec!["192.168.1.0/26", "192.168.1.64/26"]
        );
    }

    #[test]
    fn test_ipv6_subnets() {
        assert_eq!(
            subnets("2001:db8::/56", 2, 64).unwrap(),
            vec!["2001:db8::/64", "2001:db8:0:1::/64"]
        );
    }

    #[test]
    fn test_too_many_subnets() {
        let err = subnets("10.0.0.0/24", 5, 7).unwrap_err();
        assert!(matches!(err, EvalError::InvalidCidr { .. }));
    }

    #[test]
    fn test_malformed_block() {
        assert!(subnets("10.0.0.0", 1, 8).is_err());
        assert!(subnets("not-an-ip/8", 1, 8).is_err());
        assert!(subnets("10.0.0.0/40", 1, 8).is_err());
    }
}
