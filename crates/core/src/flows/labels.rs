//! Quick-reply labels shared by the flows and their callers.

pub const BACK: &str = "Back";
pub const END_CHAT: &str = "End Chat";
pub const BACK_TO_MENU: &str = "Back to Menu";

pub const PLACE_ORDER: &str = "Place Order";
pub const CONFIRM_ORDER: &str = "Confirm Order";

pub const CHECK_QUOTE: &str = "Check Quote";
pub const REVIEW_QUOTE: &str = "Review Quote";
pub const NEGOTIATE_PRICING: &str = "Negotiate Pricing";
pub const PROPOSE_ALTERNATIVE_PRICE: &str = "Propose Alternative Price";
pub const EDIT_REMARKS: &str = "Add/Edit Remarks";
pub const EDIT_PRODUCT: &str = "Edit Product Selected";
pub const EDIT_DETAILS: &str = "Edit Product Details";
pub const ACCEPT_QUOTE: &str = "Accept and Confirm Order";
pub const SUBMIT_MODIFIED: &str = "Submit Modified Quotation";
pub const UNDO_CHANGES: &str = "Undo Changes";
pub const CANCEL_ORDER: &str = "Cancel Order";
pub const BACK_TO_NEGOTIATION: &str = "Back to Negotiation";
pub const PAYMENT_METHODS: &str = "Payment Methods";

/// Case-insensitive exact match of user input against a label.
pub fn matches(input: &str, label: &str) -> bool {
    input.trim().to_lowercase() == label.trim().to_lowercase()
}

pub fn owned(labels: &[&str]) -> Vec<String> {
    labels.iter().map(|label| (*label).to_owned()).collect()
}

#[cfg(test)]
mod tests {
    use super::{matches, ACCEPT_QUOTE};

    #[test]
    fn matching_ignores_case_and_surrounding_whitespace() {
        assert!(matches("  accept AND confirm order ", ACCEPT_QUOTE));
        assert!(!matches("accept", ACCEPT_QUOTE));
    }
}
