// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::models::Account;

pub const DEFAULT_CATEGORY: &str = "Miscellaneous";
/// Sentinel override: excluded from every aggregate, reported separately.
pub const HIDDEN_CATEGORY: &str = "Hidden";

/// One classification rule. Rules are evaluated strictly in the order of
/// `CATEGORY_RULES`; within a rule the checks run account-type, then name
/// keyword, then parent keyword. This is a best-effort heuristic over
/// account naming, not a guaranteed-correct mapping.
#[derive(Debug)]
pub struct CategoryRule {
    pub key: &'static str,
    pub label: &'static str,
    pub color: &'static str,
    pub keywords: &'static [&'static str],
    pub parent_keywords: &'static [&'static str],
    pub account_types: &'static [&'static str],
}

pub static CATEGORY_RULES: &[CategoryRule] = &[
    CategoryRule {
        key: "Operations",
        label: "Operations",
        color: "#4CAF50",
        keywords: &[
            "rent", "lease", "utility", "electric", "power", "water", "maintenance", "supplies",
            "office", "facility", "cleaning", "admin", "stationery",
        ],
        parent_keywords: &["operating", "administrative", "general expenses"],
        account_types: &[],
    },
    CategoryRule {
        key: "HR",
        label: "HR & Payroll",
        color: "#FF9800",
        keywords: &[
            "salary", "payroll", "wage", "benefit", "bonus", "incentive", "allowance", "hr",
            "social insurance", "pension", "medical", "training", "recruit",
        ],
        parent_keywords: &["payroll", "human resources"],
        account_types: &[],
    },
    CategoryRule {
        key: "Sales & Marketing",
        label: "Sales & Marketing",
        color: "#2196F3",
        keywords: &[
            "marketing", "advertising", "campaign", "promotion", "sales expense", "commission",
            "event", "exhibition", "customer visit", "trade show", "branding", "lead",
        ],
        parent_keywords: &["sales expenses", "marketing", "commercial"],
        account_types: &[],
    },
    CategoryRule {
        key: "Logistics",
        label: "Logistics & Shipping",
        color: "#795548",
        keywords: &[
            "logistic", "shipping", "freight", "transport", "delivery", "courier", "customs",
            "duty", "warehouse", "handling", "clearance",
        ],
        parent_keywords: &["logistics", "transportation"],
        account_types: &[],
    },
    CategoryRule {
        key: "Production",
        label: "Production",
        color: "#9C27B0",
        keywords: &[
            "factory", "production", "manufacturing", "workshop", "machine", "tooling", "process",
            "plant", "fabrication", "direct labor",
        ],
        parent_keywords: &["manufacturing", "production expenses"],
        account_types: &[],
    },
    CategoryRule {
        key: "Finance & Legal",
        label: "Finance & Legal",
        color: "#607D8B",
        keywords: &[
            "bank charge", "interest", "finance", "loan", "legal", "law", "consult", "audit",
            "professional", "fees", "attorney",
        ],
        parent_keywords: &["financial expenses", "legal"],
        account_types: &[],
    },
    CategoryRule {
        key: "IT & Systems",
        label: "IT & Systems",
        color: "#3F51B5",
        keywords: &[
            "it", "software", "license", "subscription", "cloud", "erp", "crm", "system",
            "hosting", "server", "domain", "email", "hardware",
        ],
        parent_keywords: &["it expenses", "technology"],
        account_types: &[],
    },
    CategoryRule {
        key: "Taxes & Government",
        label: "Taxes & Government",
        color: "#F44336",
        keywords: &[
            "tax", "vat", "withholding", "gst", "zakat", "stamp", "duty", "gov", "government",
            "permit", "license", "fees",
        ],
        parent_keywords: &["taxes", "government", "duty"],
        account_types: &["Tax"],
    },
    CategoryRule {
        key: "Capital Expenditure",
        label: "Capital Expenditure",
        color: "#009688",
        keywords: &[
            "capital", "capex", "asset", "improvement", "upgrade", "renovation", "equipment",
            "furniture", "construction", "fitout", "leasehold",
        ],
        parent_keywords: &["capital expenditure", "fixed asset"],
        account_types: &["Fixed Asset"],
    },
    CategoryRule {
        key: DEFAULT_CATEGORY,
        label: "Miscellaneous",
        color: "#9E9E9E",
        keywords: &[],
        parent_keywords: &[],
        account_types: &[],
    },
];

pub fn rule_for(key: &str) -> Option<&'static CategoryRule> {
    CATEGORY_RULES.iter().find(|r| r.key == key)
}

/// Category key for an account. A manual "Hidden" override wins, then any
/// other manual override verbatim, then the rule table in order, then the
/// default bucket.
pub fn classify(account: &Account) -> String {
    if let Some(manual) = account.dashboard_category.as_deref().map(str::trim) {
        if manual == HIDDEN_CATEGORY {
            return HIDDEN_CATEGORY.to_string();
        }
        if !manual.is_empty() {
            return manual.to_string();
        }
    }
    detect_category(account).to_string()
}

fn detect_category(account: &Account) -> &'static str {
    let name = account.name.to_lowercase();
    let account_name = account.account_name.to_lowercase();
    let parent = account
        .parent_account
        .as_deref()
        .unwrap_or("")
        .to_lowercase();
    let account_type = account.account_type.as_deref().unwrap_or("");

    for rule in CATEGORY_RULES {
        if rule.key == DEFAULT_CATEGORY {
            continue;
        }
        if rule.account_types.contains(&account_type) {
            return rule.key;
        }
        if rule
            .keywords
            .iter()
            .any(|kw| name.contains(kw) || account_name.contains(kw))
        {
            return rule.key;
        }
        if rule.parent_keywords.iter().any(|kw| parent.contains(kw)) {
            return rule.key;
        }
    }
    DEFAULT_CATEGORY
}
