/// Fulfillment lifecycle of an order. Statuses only ever move forward
/// through this list; there is no path back once a stage is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    Uncompleted,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Uncompleted => "uncompleted",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    /// Position in the forward-only lifecycle.
    pub const fn rank(self) -> u8 {
        match self {
            Self::Uncompleted => 0,
            Self::Processing => 1,
            Self::Shipped => 2,
            Self::Delivered => 3,
            Self::Cancelled => 4,
        }
    }

    pub const fn can_progress_to(self, next: Self) -> bool {
        next.rank() > self.rank()
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "uncompleted" => Ok(Self::Uncompleted),
            "processing" => Ok(Self::Processing),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("Invalid order status: {s}")),
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl serde::Serialize for OrderStatus {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

/// State of the payment attached to an order. Leaves `Processing` at most
/// once, for either `Succeeded` or `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatus {
    Processing,
    Succeeded,
    Failed,
}

impl PaymentStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }

    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Processing)
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "processing" => Ok(Self::Processing),
            "succeeded" => Ok(Self::Succeeded),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Invalid payment status: {s}")),
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl serde::Serialize for PaymentStatus {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_status_round_trips_through_strings() {
        for status in [
            OrderStatus::Uncompleted,
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
        ] {
            let parsed: OrderStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn order_status_rejects_unknown_strings() {
        assert!("pending".parse::<OrderStatus>().is_err());
        assert!("UNCOMPLETED".parse::<OrderStatus>().is_err());
        assert!("".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn order_status_only_progresses_forward() {
        assert!(OrderStatus::Uncompleted.can_progress_to(OrderStatus::Processing));
        assert!(OrderStatus::Processing.can_progress_to(OrderStatus::Shipped));
        assert!(OrderStatus::Shipped.can_progress_to(OrderStatus::Delivered));

        assert!(!OrderStatus::Processing.can_progress_to(OrderStatus::Uncompleted));
        assert!(!OrderStatus::Delivered.can_progress_to(OrderStatus::Shipped));
        assert!(!OrderStatus::Processing.can_progress_to(OrderStatus::Processing));
    }

    #[test]
    fn payment_status_round_trips_through_strings() {
        for status in [
            PaymentStatus::Processing,
            PaymentStatus::Succeeded,
            PaymentStatus::Failed,
        ] {
            let parsed: PaymentStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn payment_status_rejects_unknown_strings() {
        assert!("paid".parse::<PaymentStatus>().is_err());
        assert!("Succeeded".parse::<PaymentStatus>().is_err());
    }

    #[test]
    fn payment_status_terminality() {
        assert!(!PaymentStatus::Processing.is_terminal());
        assert!(PaymentStatus::Succeeded.is_terminal());
        assert!(PaymentStatus::Failed.is_terminal());
    }

    #[test]
    fn statuses_serialize_as_wire_strings() {
        assert_eq!(
            serde_json::to_string(&OrderStatus::Uncompleted).unwrap(),
            "\"uncompleted\""
        );
        assert_eq!(
            serde_json::to_string(&PaymentStatus::Succeeded).unwrap(),
            "\"succeeded\""
        );
    }
}
