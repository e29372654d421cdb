use crate::error::{invalid_input_error, Error};

pub fn not_empty(value: &str) -> Result<(), Error> {
    if value.trim().is_empty() {
        return Err(invalid_input_error());
    }

    Ok(())
}

pub fn min_length(value: &str, min: usize) -> Result<(), Error> {
    if value.chars().count() < min {
        return Err(invalid_input_error());
    }

    Ok(())
}

/// `local@domain.tld`, no whitespace. Deliberately loose.
pub fn email(value: &str) -> Result<(), Error> {
    let valid = match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain
                    .split_once('.')
                    .map_or(false, |(name, _)| !name.is_empty())
                && !domain.ends_with('.')
                && !value.chars().any(char::is_whitespace)
        }
        None => false,
    };

    if !valid {
        return Err(invalid_input_error());
    }

    Ok(())
}

#[test]
fn email_shapes() {
    assert!(email("test@test.com").is_ok());
    assert!(email("first.last@mail.example.org").is_ok());

    let rejected = [
        "",
        "test",
        "@test.com",
        "test@",
        "test@com",
        "test@.com",
        "a@b.",
        "a b@c.com",
        "a@b@c.com",
    ];

    for bad in rejected {
        assert!(email(bad).is_err(), "{} should be rejected", bad);
    }
}

#[test]
fn lengths_count_characters() {
    assert!(min_length("héllo", 5).is_ok());
    assert!(min_length("four", 5).is_err());
    assert!(not_empty("  ").is_err());
    assert!(not_empty("x").is_ok());
}
