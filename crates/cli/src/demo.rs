use lexmetric_core::{Money, Transaction};

/// Source file name stamped on every demo transaction.
pub const DEMO_SOURCE: &str = "DEMO_DATA";

struct DemoTxn {
    date: &'static str,
    description: &'static str,
    cents: i64,
}

/// A year of activity that trips every rule at least once.
const DEMO_TXNS: &[DemoTxn] = &[
    DemoTxn { date: "01/15/2025", description: "VENMO PAYMENT TO @JOHNNY-B-GOOD", cents: -15_000 },
    DemoTxn { date: "02/15/2025", description: "VENMO PAYMENT TO @JOHNNY-B-GOOD", cents: -15_000 },
    DemoTxn { date: "03/15/2025", description: "VENMO PAYMENT TO @JOHNNY-B-GOOD", cents: -15_000 },
    DemoTxn { date: "04/15/2025", description: "VENMO PAYMENT TO @JOHNNY-B-GOOD", cents: -15_000 },
    DemoTxn { date: "05/01/2025", description: "ATM WITHDRAWAL - MAIN ST BRANCH", cents: -49_000 },
    DemoTxn { date: "05/03/2025", description: "ATM WITHDRAWAL - MAIN ST BRANCH", cents: -49_000 },
    DemoTxn { date: "05/10/2025", description: "CASH WITHDRAWAL TELLER #4", cents: -40_000 },
    DemoTxn { date: "06/12/2025", description: "ST. MARY'S CHURCH DONATION", cents: -10_000 },
    DemoTxn { date: "07/01/2025", description: "CHECK #104 SUSAN MILLER", cents: -200_000 },
    DemoTxn { date: "08/01/2025", description: "CHECK #105 SUSAN MILLER", cents: -200_000 },
    DemoTxn { date: "10/05/2025", description: "ONLINE TRANSFER TO ACCT ...x9999", cents: -1_500_000 },
];

pub fn demo_transactions() -> Vec<Transaction> {
    DEMO_TXNS
        .iter()
        .map(|t| Transaction::new(t.date, t.description, Money::from_cents(t.cents), DEMO_SOURCE, 1))
        .collect()
}
