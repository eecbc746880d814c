//! Rule-based completions used whenever no provider is reachable.
//!
//! Deliberately deterministic: the same prompt always yields the same text,
//! so the degraded system stays testable and predictable. These answers are
//! conversational stand-ins, not structured plans — decision parsers treat
//! them as unparseable and fall back to zero-confidence escalation, which is
//! exactly the intended behavior when no model is available.

/// Produces a deterministic response for the given prompt.
pub fn completion(prompt: &str) -> String {
    let p = prompt.to_lowercase();

    if p.contains("leave") && p.contains("balance") {
        return "You can check your leave balance in the employee portal or contact HR."
            .to_string();
    }
    if p.contains("policy") {
        return "Please refer to the employee handbook or ask HR for specific policy details."
            .to_string();
    }
    if p.contains("ticket") || p.contains("incident") {
        return "Please restart the affected service and escalate to IT support if the issue \
                persists."
            .to_string();
    }
    if p.contains("expense") || p.contains("reimburs") {
        return "Submit the expense with a receipt; claims within the auto-approval limit are \
                processed immediately."
            .to_string();
    }
    "I understand your query. Please contact the relevant department for detailed assistance."
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_deterministic() {
        assert_eq!(completion("what is the policy?"), completion("what is the policy?"));
    }

    #[test]
    fn keyword_routing() {
        assert!(completion("leave balance for EMP001").contains("leave balance"));
        assert!(completion("remote work policy").contains("handbook"));
        assert!(completion("my laptop ticket").contains("IT support"));
        assert!(completion("expense claim of 120").contains("receipt"));
    }

    #[test]
    fn generic_fallback_for_unknown_prompts() {
        let out = completion("xyzzy");
        assert!(out.contains("contact the relevant department"));
    }
}
