//! Issuer alias table.
//!
//! A handful of CAs sign the overwhelming majority of certificates a scan
//! observes; storing their distinguished names once as short aliases keeps
//! record lines small. The table is a bijection: expanding a compacted
//! issuer always yields the original string.

const TABLE: &[(&str, &str)] = &[
    ("LE_R3", "C=US, O=Let's Encrypt, CN=R3"),
    ("LE_R10", "C=US, O=Let's Encrypt, CN=R10"),
    ("LE_R11", "C=US, O=Let's Encrypt, CN=R11"),
    ("LE_E1", "C=US, O=Let's Encrypt, CN=E1"),
    ("LE_E5", "C=US, O=Let's Encrypt, CN=E5"),
    ("LE_E6", "C=US, O=Let's Encrypt, CN=E6"),
    ("GTS_WR3", "C=US, O=Google Trust Services, CN=WR3"),
    ("GTS_WE1", "C=US, O=Google Trust Services, CN=WE1"),
    ("GTS_1C3", "C=US, O=Google Trust Services LLC, CN=GTS CA 1C3"),
    ("GTS_1D4", "C=US, O=Google Trust Services LLC, CN=GTS CA 1D4"),
    (
        "DIGICERT_G2_2020",
        "C=US, O=DigiCert Inc, CN=DigiCert Global G2 TLS RSA SHA256 2020 CA1",
    ),
    (
        "DIGICERT_SHA2_SECURE",
        "C=US, O=DigiCert Inc, OU=www.digicert.com, CN=DigiCert SHA2 Secure Server CA",
    ),
    ("AMAZON_RSA_M02", "C=US, O=Amazon, CN=Amazon RSA 2048 M02"),
    ("AMAZON_RSA_M03", "C=US, O=Amazon, CN=Amazon RSA 2048 M03"),
    ("AMAZON_ECDSA_M03", "C=US, O=Amazon, CN=Amazon ECDSA 256 M03"),
    (
        "CLOUDFLARE_ECC_CA3",
        "C=US, O=Cloudflare, Inc., CN=Cloudflare Inc ECC CA-3",
    ),
    (
        "SECTIGO_DV",
        "C=GB, ST=Greater Manchester, L=Salford, O=Sectigo Limited, CN=Sectigo RSA Domain Validation Secure Server CA",
    ),
    (
        "GLOBALSIGN_ATLAS_R3",
        "C=BE, O=GlobalSign nv-sa, CN=GlobalSign Atlas R3 DV TLS CA 2025 Q1",
    ),
];

/// The alias for a full issuer string, if the table knows it.
#[must_use]
pub fn compact_issuer(full: &str) -> Option<&'static str> {
    TABLE
        .iter()
        .find(|(_, issuer)| *issuer == full)
        .map(|(alias, _)| *alias)
}

/// The full issuer string behind an alias, if the table knows it.
#[must_use]
pub fn expand_issuer(alias: &str) -> Option<&'static str> {
    TABLE
        .iter()
        .find(|(candidate, _)| *candidate == alias)
        .map(|(_, issuer)| *issuer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn table_is_a_bijection() {
        let aliases: HashSet<_> = TABLE.iter().map(|(a, _)| a).collect();
        let issuers: HashSet<_> = TABLE.iter().map(|(_, i)| i).collect();
        assert_eq!(aliases.len(), TABLE.len());
        assert_eq!(issuers.len(), TABLE.len());
    }

    #[test]
    fn expand_inverts_compact() {
        for (_, issuer) in TABLE {
            let alias = compact_issuer(issuer).unwrap();
            assert_eq!(expand_issuer(alias), Some(*issuer));
        }
    }

    #[test]
    fn known_aliases() {
        assert_eq!(
            compact_issuer("C=US, O=Google Trust Services, CN=WR3"),
            Some("GTS_WR3")
        );
        assert_eq!(
            expand_issuer("LE_R3"),
            Some("C=US, O=Let's Encrypt, CN=R3")
        );
    }

    #[test]
    fn unknown_issuers_pass_through() {
        assert_eq!(compact_issuer("C=XX, O=Nobody, CN=Unknown"), None);
        assert_eq!(expand_issuer("NOT_AN_ALIAS"), None);
    }
}
