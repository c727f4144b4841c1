//! Reserved endpoint names
//!
//! Two sets: names nobody can claim, and organisation names claimable only
//! by a tenant whose verified mail address is on that organisation's domain.

/// Never claimable, regardless of plan
const RESERVED_NAMES: &[&str] = &[
    "admin",
    "api",
    "app",
    "auth",
    "blog",
    "dashboard",
    "docs",
    "help",
    "inspect",
    "mail",
    "status",
    "www",
];

/// Claimable only with a matching organisation mail address
const RESERVED_ORGS: &[&str] = &[
    "github", "gitlab", "google", "paypal", "shopify", "slack", "stripe", "twilio",
];

/// Public mail hosts that never count as organisation addresses
const PUBLIC_MAIL_HOSTS: &[&str] = &[
    "gmail.com",
    "googlemail.com",
    "hotmail.com",
    "outlook.com",
    "proton.me",
    "yahoo.com",
];

pub fn is_reserved(name: &str) -> bool {
    RESERVED_NAMES.contains(&name)
}

pub fn is_reserved_org(name: &str) -> bool {
    RESERVED_ORGS.contains(&name)
}

/// Whether `email` belongs to the organisation `name` is reserved for.
/// Mail on a public provider never qualifies, whatever the mailbox says.
pub fn email_matches_org(email: &str, name: &str) -> bool {
    let email = email.to_lowercase();
    let Some((_, host)) = email.rsplit_once('@').filter(|(_, h)| !h.is_empty()) else {
        return false;
    };

    if PUBLIC_MAIL_HOSTS.contains(&host) {
        return false;
    }

    host.contains(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_sets_are_disjoint() {
        for org in RESERVED_ORGS {
            assert!(!is_reserved(org), "{org} must not be in both sets");
        }
    }

    #[test]
    fn test_email_matches_org() {
        assert!(email_matches_org("dev@stripe.com", "stripe"));
        assert!(email_matches_org("Dev@corp.stripe.io", "stripe"));
        assert!(!email_matches_org("stripe@gmail.com", "stripe"));
        assert!(!email_matches_org("dev@acme.com", "stripe"));
        assert!(!email_matches_org("not-an-email", "stripe"));
    }
}
