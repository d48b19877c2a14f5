//! Validation utilities for the Warehouse Stock Management Platform

use rust_decimal::Decimal;

/// Validate that an operation quantity is strictly positive and finite
pub fn validate_positive_quantity(qty: Decimal) -> Result<(), &'static str> {
    if qty <= Decimal::ZERO {
        return Err("Quantity must be greater than zero");
    }
    Ok(())
}

/// Validate a barcode (1-64 characters, no surrounding whitespace)
pub fn validate_barcode(barcode: &str) -> Result<(), &'static str> {
    if barcode.trim().is_empty() {
        return Err("Barcode cannot be empty");
    }
    if barcode.len() > 64 {
        return Err("Barcode must be at most 64 characters");
    }
    if barcode != barcode.trim() {
        return Err("Barcode cannot have surrounding whitespace");
    }
    Ok(())
}

/// Validate warehouse code format (3-10 uppercase alphanumeric)
pub fn validate_warehouse_code(code: &str) -> Result<(), &'static str> {
    if code.len() < 3 {
        return Err("Warehouse code must be at least 3 characters");
    }
    if code.len() > 10 {
        return Err("Warehouse code must be at most 10 characters");
    }
    if !code.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()) {
        return Err("Warehouse code must be uppercase alphanumeric only");
    }
    Ok(())
}

/// Validate a batch number (1-64 characters, alphanumeric plus dash/underscore)
pub fn validate_batch_number(batch_number: &str) -> Result<(), &'static str> {
    if batch_number.is_empty() {
        return Err("Batch number cannot be empty");
    }
    if batch_number.len() > 64 {
        return Err("Batch number must be at most 64 characters");
    }
    if !batch_number
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err("Batch number must be alphanumeric with dashes or underscores only");
    }
    Ok(())
}

/// Validate email format (basic check)
pub fn validate_email(email: &str) -> Result<(), &'static str> {
    if email.contains('@') && email.contains('.') && email.len() >= 5 {
        Ok(())
    } else {
        Err("Invalid email format")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positive_quantity() {
        assert!(validate_positive_quantity(Decimal::from(1)).is_ok());
        assert!(validate_positive_quantity(Decimal::ZERO).is_err());
        assert!(validate_positive_quantity(Decimal::from(-5)).is_err());
    }

    #[test]
    fn test_valid_warehouse_codes() {
        assert!(validate_warehouse_code("BKK").is_ok());
        assert!(validate_warehouse_code("CNX01").is_ok());
        assert!(validate_warehouse_code("ABCDEFGHIJ").is_ok());
    }

    #[test]
    fn test_invalid_warehouse_codes() {
        assert!(validate_warehouse_code("AB").is_err()); // Too short
        assert!(validate_warehouse_code("ABCDEFGHIJK").is_err()); // Too long
        assert!(validate_warehouse_code("bkk").is_err()); // Lowercase
        assert!(validate_warehouse_code("BK-1").is_err()); // Special char
    }

    #[test]
    fn test_batch_numbers() {
        assert!(validate_batch_number("B100").is_ok());
        assert!(validate_batch_number("B100-T1717243200").is_ok());
        assert!(validate_batch_number("").is_err());
        assert!(validate_batch_number("B 100").is_err());
    }

    #[test]
    fn test_barcodes() {
        assert!(validate_barcode("8850123456789").is_ok());
        assert!(validate_barcode("").is_err());
        assert!(validate_barcode(" A1").is_err());
    }

    #[test]
    fn test_email() {
        assert!(validate_email("stock@example.co.th").is_ok());
        assert!(validate_email("nope").is_err());
    }
}
