use {
    crate::ingest::types::Order,
    serde::Serialize,
    std::collections::{BTreeMap, HashMap},
};

/// Status tokens counted as completed (compared after lower-casing at parse time)
pub const COMPLETED_STATUSES: [&str; 3] = ["xong", "done", "đã lên đơn"];

pub fn is_completed(status: &str) -> bool {
    COMPLETED_STATUSES.contains(&status)
}

/// Totals across a set of orders
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_revenue: f64,
    pub total_deposit: f64,
    pub total_shipping: f64,
    pub total_remaining: f64,
    pub total_orders: usize,
    pub completed_orders: usize,
}

/// Spend of one customer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerStat {
    pub name: String,
    pub total_spent: f64,
    pub order_count: usize,
}

/// Revenue of one day (`YYYY-MM-DD`) or month (`YYYY-MM`)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodRevenue {
    #[serde(rename = "date")]
    pub period: String,
    pub revenue: f64,
    pub orders: usize,
}

pub fn summarize(orders: &[Order]) -> Summary {
    orders.iter().fold(Summary::default(), |mut acc, order| {
        acc.total_revenue += order.total;
        acc.total_deposit += order.deposit;
        acc.total_shipping += order.shipping;
        acc.total_remaining += order.remaining;
        acc.total_orders += 1;
        if is_completed(&order.status) {
            acc.completed_orders += 1;
        }
        acc
    })
}

/// Customers ranked by total spend, highest first.
///
/// Equal spends keep first-encounter order.
pub fn top_customers(orders: &[Order], limit: usize) -> Vec<CustomerStat> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut stats: Vec<CustomerStat> = Vec::new();

    for order in orders {
        if order.customer_name.is_empty() {
            continue;
        }
        match index.get(order.customer_name.as_str()) {
            Some(&i) => {
                stats[i].total_spent += order.total;
                stats[i].order_count += 1;
            }
            None => {
                index.insert(order.customer_name.as_str(), stats.len());
                stats.push(CustomerStat {
                    name: order.customer_name.clone(),
                    total_spent: order.total,
                    order_count: 1,
                });
            }
        }
    }

    // sort_by is stable
    stats.sort_by(|a, b| b.total_spent.total_cmp(&a.total_spent));
    stats.truncate(limit);
    stats
}

fn rollup<F>(orders: &[Order], period_of: F) -> Vec<PeriodRevenue>
where
    F: Fn(&str) -> &str,
{
    let mut periods: BTreeMap<&str, (f64, usize)> = BTreeMap::new();

    for order in orders.iter().filter(|o| !o.date.is_empty()) {
        let entry = periods.entry(period_of(&order.date)).or_insert((0.0, 0));
        entry.0 += order.total;
        entry.1 += 1;
    }

    periods
        .into_iter()
        .map(|(period, (revenue, count))| PeriodRevenue {
            period: period.to_string(),
            revenue,
            orders: count,
        })
        .collect()
}

/// Revenue per day, ascending. Orders without a date are left out.
pub fn daily_revenue(orders: &[Order]) -> Vec<PeriodRevenue> {
    rollup(orders, |date| date)
}

/// Revenue per `YYYY-MM`, ascending. Orders without a date are left out.
pub fn monthly_revenue(orders: &[Order]) -> Vec<PeriodRevenue> {
    rollup(orders, |date| date.get(..7).unwrap_or(date))
}

/// Orders of one sheet; `None` keeps every sheet
pub fn filter_by_sheet(orders: &[Order], sheet: Option<&str>) -> Vec<Order> {
    match sheet {
        None => orders.to_vec(),
        Some(name) => orders.iter().filter(|o| o.sheet_name == name).cloned().collect(),
    }
}

/// Orders whose customer name equals `name`, ignoring case
pub fn orders_for_customer(orders: &[Order], name: &str) -> Vec<Order> {
    let wanted = name.trim().to_lowercase();
    orders
        .iter()
        .filter(|o| o.customer_name.to_lowercase() == wanted)
        .cloned()
        .collect()
}

/// Case-insensitive substring search over name, address/phone, date and notes
pub fn search_orders(orders: &[Order], query: &str) -> Vec<Order> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return orders.to_vec();
    }

    orders
        .iter()
        .filter(|o| {
            o.customer_name.to_lowercase().contains(&query)
                || o.address_phone_notes.to_lowercase().contains(&query)
                || o.date.contains(&query)
                || o.notes.to_lowercase().contains(&query)
        })
        .cloned()
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Date,
    CustomerName,
    Total,
    Remaining,
    Status,
}

impl std::str::FromStr for SortField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "date" => Ok(SortField::Date),
            "customer" | "customerName" => Ok(SortField::CustomerName),
            "total" => Ok(SortField::Total),
            "remaining" => Ok(SortField::Remaining),
            "status" => Ok(SortField::Status),
            other => Err(format!("unknown sort field '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Stable in-place sort; equal keys keep their current order in both directions
pub fn sort_orders(orders: &mut [Order], field: SortField, direction: SortDirection) {
    orders.sort_by(|a, b| {
        let cmp = match field {
            SortField::Date => a.date.cmp(&b.date),
            SortField::CustomerName => a.customer_name.cmp(&b.customer_name),
            SortField::Total => a.total.total_cmp(&b.total),
            SortField::Remaining => a.remaining.total_cmp(&b.remaining),
            SortField::Status => a.status.cmp(&b.status),
        };
        match direction {
            SortDirection::Asc => cmp,
            SortDirection::Desc => cmp.reverse(),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_order(customer: &str, total: f64, date: &str, status: &str) -> Order {
        Order {
            id: format!("Order 2024-{}-{}", customer, total),
            date: date.to_string(),
            customer_name: customer.to_string(),
            address_phone_notes: String::new(),
            total,
            deposit: total / 2.0,
            shipping: 10.0,
            remaining: total / 2.0,
            status: status.to_string(),
            notes: String::new(),
            sheet_name: "Order 2024".to_string(),
        }
    }

    #[test]
    fn test_summarize() {
        let orders = vec![
            create_test_order("A", 100.0, "2024-01-01", "xong"),
            create_test_order("B", 300.0, "", "done"),
            create_test_order("C", 50.0, "2024-01-02", "đã lên đơn"),
            create_test_order("D", 20.0, "2024-01-02", "chưa xong"),
            create_test_order("E", 30.0, "2024-01-03", "Done"),
        ];

        let summary = summarize(&orders);
        assert_eq!(summary.total_revenue, 500.0);
        assert_eq!(summary.total_deposit, 250.0);
        assert_eq!(summary.total_shipping, 50.0);
        assert_eq!(summary.total_remaining, 250.0);
        assert_eq!(summary.total_orders, 5);
        // "Done" was not lower-cased upstream, so it is not a match
        assert_eq!(summary.completed_orders, 3);
    }

    #[test]
    fn test_summarize_is_idempotent() {
        let orders = vec![
            create_test_order("A", 100.0, "2024-01-01", "xong"),
            create_test_order("B", 0.1, "2024-01-01", ""),
        ];
        let before = orders.clone();

        assert_eq!(summarize(&orders), summarize(&orders));
        assert_eq!(orders, before);
    }

    #[test]
    fn test_summarize_empty() {
        assert_eq!(summarize(&[]), Summary::default());
    }

    #[test]
    fn test_top_customers_ranking() {
        let orders = vec![
            create_test_order("A", 100.0, "2024-01-01", ""),
            create_test_order("B", 300.0, "2024-01-01", ""),
            create_test_order("A", 50.0, "2024-01-02", ""),
        ];

        let top = top_customers(&orders, 2);
        assert_eq!(
            top,
            vec![
                CustomerStat { name: "B".to_string(), total_spent: 300.0, order_count: 1 },
                CustomerStat { name: "A".to_string(), total_spent: 150.0, order_count: 2 },
            ]
        );
    }

    #[test]
    fn test_top_customers_ties_keep_encounter_order() {
        let orders = vec![
            create_test_order("Z", 100.0, "", ""),
            create_test_order("M", 100.0, "", ""),
            create_test_order("A", 100.0, "", ""),
            create_test_order("Q", 10.0, "", ""),
        ];

        let names: Vec<String> = top_customers(&orders, 10).into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["Z", "M", "A", "Q"]);
        assert_eq!(top_customers(&orders, 1).len(), 1);
        assert!(top_customers(&orders, 0).is_empty());
    }

    #[test]
    fn test_monthly_rollup() {
        let orders = vec![
            create_test_order("A", 100.0, "2024-01-05", ""),
            create_test_order("B", 50.0, "2024-01-20", ""),
        ];

        assert_eq!(
            monthly_revenue(&orders),
            vec![PeriodRevenue { period: "2024-01".to_string(), revenue: 150.0, orders: 2 }]
        );
    }

    #[test]
    fn test_daily_rollup_sorted_and_skips_empty_dates() {
        let orders = vec![
            create_test_order("A", 10.0, "2024-02-01", ""),
            create_test_order("B", 20.0, "", ""),
            create_test_order("C", 30.0, "2023-12-31", ""),
            create_test_order("D", 40.0, "2024-02-01", ""),
        ];

        let daily = daily_revenue(&orders);
        assert_eq!(daily.len(), 2);
        assert_eq!(daily[0].period, "2023-12-31");
        assert_eq!(daily[1].period, "2024-02-01");
        assert_eq!(daily[1].revenue, 50.0);
        assert_eq!(daily[1].orders, 2);

        // The undated order still counts in the summary
        assert_eq!(summarize(&orders).total_orders, 4);
    }

    #[test]
    fn test_period_revenue_wire_name() {
        let json = serde_json::to_value(PeriodRevenue {
            period: "2024-01".to_string(),
            revenue: 1.0,
            orders: 1,
        })
        .unwrap();
        assert_eq!(json["date"], "2024-01");
    }

    #[test]
    fn test_filters() {
        let mut orders = vec![
            create_test_order("Chị Lan", 100.0, "2024-03-01", ""),
            create_test_order("Minh", 200.0, "2024-03-02", ""),
        ];
        orders[1].sheet_name = "Order 2025".to_string();
        orders[1].notes = "Giao gấp".to_string();

        assert_eq!(filter_by_sheet(&orders, None).len(), 2);
        assert_eq!(filter_by_sheet(&orders, Some("Order 2025"))[0].customer_name, "Minh");
        assert_eq!(orders_for_customer(&orders, "chị lan").len(), 1);
        assert!(orders_for_customer(&orders, "lan").is_empty());
        assert_eq!(search_orders(&orders, "lan")[0].customer_name, "Chị Lan");
        assert_eq!(search_orders(&orders, "GIAO")[0].customer_name, "Minh");
        assert_eq!(search_orders(&orders, "2024-03").len(), 2);
        assert_eq!(search_orders(&orders, "  ").len(), 2);
    }

    #[test]
    fn test_sort_orders() {
        let mut orders = vec![
            create_test_order("B", 200.0, "2024-01-02", "done"),
            create_test_order("A", 100.0, "2024-01-03", "xong"),
            create_test_order("C", 200.0, "2024-01-01", ""),
        ];

        sort_orders(&mut orders, SortField::Date, SortDirection::Desc);
        assert_eq!(orders[0].customer_name, "A");

        sort_orders(&mut orders, SortField::Total, SortDirection::Desc);
        let names: Vec<&str> = orders.iter().map(|o| o.customer_name.as_str()).collect();
        // B and C tie on total and keep their previous relative order
        assert_eq!(names, vec!["B", "C", "A"]);

        sort_orders(&mut orders, SortField::CustomerName, SortDirection::Asc);
        assert_eq!(orders[0].customer_name, "A");

        assert_eq!("customer".parse::<SortField>(), Ok(SortField::CustomerName));
        assert!("price".parse::<SortField>().is_err());
    }
}
