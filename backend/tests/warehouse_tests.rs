//! Warehouse registry tests
//!
//! Tests for warehouse identity rules including:
//! - Code and barcode validation
//! - Central-warehouse exclusivity

use proptest::prelude::*;

use shared::validation::{validate_barcode, validate_warehouse_code};

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Warehouse codes: 3-10 uppercase alphanumeric characters
    #[test]
    fn test_valid_warehouse_codes() {
        for code in ["CTR", "WH01", "NORTH22", "A1B2C3D4E5"] {
            assert!(validate_warehouse_code(code).is_ok(), "{} should be valid", code);
        }
    }

    #[test]
    fn test_invalid_warehouse_codes() {
        for code in ["", "AB", "lowercase", "TOO-LONG-CODE", "WH 1", "ไทย"] {
            assert!(validate_warehouse_code(code).is_err(), "{} should be invalid", code);
        }
    }

    /// Barcodes: non-empty, bounded, no surrounding whitespace
    #[test]
    fn test_barcode_rules() {
        assert!(validate_barcode("8850999320113").is_ok());
        assert!(validate_barcode("A-1").is_ok());
        assert!(validate_barcode("").is_err());
        assert!(validate_barcode(" A1").is_err());
        assert!(validate_barcode(&"x".repeat(65)).is_err());
    }

    /// Central exclusivity: promoting one warehouse demotes the rest
    #[test]
    fn test_central_flag_exclusive() {
        let mut flags = vec![("Central", true), ("North", false), ("South", false)];

        // Promote "South": clear all, set the target
        for f in flags.iter_mut() {
            f.1 = f.0 == "South";
        }

        assert_eq!(flags.iter().filter(|(_, central)| *central).count(), 1);
        assert!(flags.iter().any(|(name, central)| *name == "South" && *central));
    }
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    /// Every generated uppercase alphanumeric code in range validates
    #[test]
    fn prop_generated_codes_validate(code in "[A-Z0-9]{3,10}") {
        prop_assert!(validate_warehouse_code(&code).is_ok());
    }

    /// Codes outside the length bounds never validate
    #[test]
    fn prop_out_of_bounds_codes_rejected(code in "[A-Z0-9]{11,20}") {
        prop_assert!(validate_warehouse_code(&code).is_err());
    }
}
