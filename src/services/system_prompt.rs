//! System Prompt
//!
//! Builds the instructions sent with every exchange of a turn: the
//! assistant's role, the collections of the workforce database, query
//! guidelines and the operations currently offered.

use chrono::{DateTime, Utc};

/// Whether a collection holds reference data or per-day records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionGroup {
    Master,
    Transactional,
}

/// A collection of the workforce database as described to the model.
#[derive(Debug, Clone, Copy)]
pub struct CollectionInfo {
    pub name: &'static str,
    pub group: CollectionGroup,
    pub description: &'static str,
}

pub const WFM_COLLECTIONS: &[CollectionInfo] = &[
    CollectionInfo {
        name: "employees",
        group: CollectionGroup::Master,
        description: "Employee records with badges, names, contact info, employment history and addresses",
    },
    CollectionInfo {
        name: "activities",
        group: CollectionGroup::Master,
        description: "Work activity definitions and descriptions",
    },
    CollectionInfo {
        name: "activityTypes",
        group: CollectionGroup::Master,
        description: "Categories and types of work activities",
    },
    CollectionInfo {
        name: "paycodes",
        group: CollectionGroup::Master,
        description: "Payroll codes and compensation rules",
    },
    CollectionInfo {
        name: "itms_wfm_roles",
        group: CollectionGroup::Master,
        description: "User roles and permissions in the WFM system",
    },
    CollectionInfo {
        name: "ITMS_HOLIDAYS_LIST",
        group: CollectionGroup::Master,
        description: "Holiday schedules with HOL_DATE (date), HOL_DESC (description) and NAME fields",
    },
    CollectionInfo {
        name: "dailyActivities",
        group: CollectionGroup::Transactional,
        description: "Daily activity tracking, time logs and employee assignments",
    },
    CollectionInfo {
        name: "itms_wfm_payroll",
        group: CollectionGroup::Transactional,
        description: "Payroll records with hours worked, dates, counties and employee details",
    },
    CollectionInfo {
        name: "itms_wfm_user_roles",
        group: CollectionGroup::Transactional,
        description: "User role assignments and access permissions",
    },
];

const GUIDELINES: &[&str] = &[
    "Always use the available operations to fetch real data before answering; never invent records.",
    "For holidays, query ITMS_HOLIDAYS_LIST and filter on HOL_DATE.",
    "When analyzing payroll data, focus on hours, counties, dates and trends.",
    "For employee questions, consider badge IDs, names, employment types and locations.",
    "Pass arguments using the exact parameter names in each operation's schema.",
    "For date comparisons use MongoDB Extended JSON, e.g. {\"$date\": \"2025-07-26T00:00:00Z\"}.",
    "Prefer narrow queries with a limit or projection; large results are truncated.",
    "If an operation fails or times out, adjust the arguments and try again, or explain what went wrong.",
    "Format results clearly for HR and management stakeholders and suggest useful follow-up questions.",
];

fn push_group(prompt: &mut String, heading: &str, group: CollectionGroup) {
    let members: Vec<&CollectionInfo> = WFM_COLLECTIONS
        .iter()
        .filter(|c| c.group == group)
        .collect();
    prompt.push_str(&format!("{} ({} collections):\n", heading, members.len()));
    for c in members {
        prompt.push_str(&format!("- {}: {}\n", c.name, c.description));
    }
}

/// Build the system prompt for one turn.
pub fn build_system_prompt(database: &str, operations: &[&str], now: DateTime<Utc>) -> String {
    let mut prompt = format!(
        "You are a Workforce Management Database Assistant with expertise in HR analytics and \
         workforce data. You have read-only access to the MongoDB database '{}' containing {} \
         collections of workforce data.\n\nDATABASE STRUCTURE:\n",
        database,
        WFM_COLLECTIONS.len()
    );
    push_group(&mut prompt, "MASTER DATA", CollectionGroup::Master);
    push_group(&mut prompt, "TRANSACTIONAL DATA", CollectionGroup::Transactional);

    prompt.push('\n');
    if operations.is_empty() {
        prompt.push_str("No database operations are available right now.\n");
    } else {
        prompt.push_str(&format!("Available operations: {}\n", operations.join(", ")));
    }

    prompt.push_str("\nQUERY GUIDELINES:\n");
    for (i, rule) in GUIDELINES.iter().enumerate() {
        prompt.push_str(&format!("{}. {}\n", i + 1, rule));
    }

    prompt.push_str(&format!(
        "\nAlways pass database \"{}\" to operations that take a database argument.\n\
         Current time: {}\n",
        database,
        now.to_rfc3339()
    ));
    prompt
}
