//! Vendor action vocabulary.
//!
//! The gateway API is split into two capability sets: actions the engine may
//! send ([`RequestAction`]) and event kinds the engine may receive
//! ([`EventKind`]). Each variant carries the vendor's wire name, which is also
//! the name used by coverage verification.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Returned when parsing a name that is not part of the vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown vendor action: {0}")]
pub struct UnknownAction(pub String);

macro_rules! vendor_actions {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $variant:ident => $wire:literal, )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $wire)]
                $variant,
            )+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[ $( $name::$variant, )+ ];

            /// The vendor wire name.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $( $name::$variant => $wire, )+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownAction;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $wire => Ok($name::$variant), )+
                    _ => Err(UnknownAction(s.to_string())),
                }
            }
        }
    };
}

vendor_actions! {
    /// Outbound actions: requests and their cancellations.
    pub enum RequestAction {
        CalculateImpliedVolatility => "calculateImpliedVolatility",
        CalculateOptionPrice => "calculateOptionPrice",
        CancelAccountSummary => "cancelAccountSummary",
        CancelAccountUpdatesMulti => "cancelAccountUpdatesMulti",
        CancelCalculateImpliedVolatility => "cancelCalculateImpliedVolatility",
        CancelCalculateOptionPrice => "cancelCalculateOptionPrice",
        CancelFundamentalData => "cancelFundamentalData",
        CancelHeadTimeStamp => "cancelHeadTimeStamp",
        CancelHistogramData => "cancelHistogramData",
        CancelHistoricalData => "cancelHistoricalData",
        CancelMktData => "cancelMktData",
        CancelMktDepth => "cancelMktDepth",
        CancelNewsBulletins => "cancelNewsBulletins",
        CancelOrder => "cancelOrder",
        CancelPnL => "cancelPnL",
        CancelPnLSingle => "cancelPnLSingle",
        CancelPositions => "cancelPositions",
        CancelPositionsMulti => "cancelPositionsMulti",
        CancelRealTimeBars => "cancelRealTimeBars",
        CancelScannerSubscription => "cancelScannerSubscription",
        CancelTickByTickData => "cancelTickByTickData",
        ExerciseOptions => "exerciseOptions",
        PlaceOrder => "placeOrder",
        QueryDisplayGroups => "queryDisplayGroups",
        ReplaceFa => "replaceFA",
        ReqAccountSummary => "reqAccountSummary",
        ReqAccountUpdates => "reqAccountUpdates",
        ReqAccountUpdatesMulti => "reqAccountUpdatesMulti",
        ReqAllOpenOrders => "reqAllOpenOrders",
        ReqAutoOpenOrders => "reqAutoOpenOrders",
        ReqCompletedOrders => "reqCompletedOrders",
        ReqContractDetails => "reqContractDetails",
        ReqCurrentTime => "reqCurrentTime",
        ReqExecutions => "reqExecutions",
        ReqFamilyCodes => "reqFamilyCodes",
        ReqFundamentalData => "reqFundamentalData",
        ReqGlobalCancel => "reqGlobalCancel",
        ReqHeadTimeStamp => "reqHeadTimeStamp",
        ReqHistogramData => "reqHistogramData",
        ReqHistoricalData => "reqHistoricalData",
        ReqHistoricalNews => "reqHistoricalNews",
        ReqHistoricalTicks => "reqHistoricalTicks",
        ReqIds => "reqIds",
        ReqManagedAccts => "reqManagedAccts",
        ReqMarketDataType => "reqMarketDataType",
        ReqMarketRule => "reqMarketRule",
        ReqMatchingSymbols => "reqMatchingSymbols",
        ReqMktData => "reqMktData",
        ReqMktDepth => "reqMktDepth",
        ReqMktDepthExchanges => "reqMktDepthExchanges",
        ReqNewsArticle => "reqNewsArticle",
        ReqNewsBulletins => "reqNewsBulletins",
        ReqNewsProviders => "reqNewsProviders",
        ReqOpenOrders => "reqOpenOrders",
        ReqPnL => "reqPnL",
        ReqPnLSingle => "reqPnLSingle",
        ReqPositions => "reqPositions",
        ReqPositionsMulti => "reqPositionsMulti",
        ReqRealTimeBars => "reqRealTimeBars",
        ReqScannerParameters => "reqScannerParameters",
        ReqScannerSubscription => "reqScannerSubscription",
        ReqSecDefOptParams => "reqSecDefOptParams",
        ReqSmartComponents => "reqSmartComponents",
        ReqSoftDollarTiers => "reqSoftDollarTiers",
        ReqTickByTickData => "reqTickByTickData",
        RequestFa => "requestFA",
        SetServerLogLevel => "setServerLogLevel",
        SubscribeToGroupEvents => "subscribeToGroupEvents",
        UnsubscribeFromGroupEvents => "unsubscribeFromGroupEvents",
        UpdateDisplayGroup => "updateDisplayGroup",
    }
}

vendor_actions! {
    /// Inbound event kinds (the vendor's callback methods).
    pub enum EventKind {
        AccountDownloadEnd => "accountDownloadEnd",
        AccountSummary => "accountSummary",
        AccountSummaryEnd => "accountSummaryEnd",
        AccountUpdateMulti => "accountUpdateMulti",
        AccountUpdateMultiEnd => "accountUpdateMultiEnd",
        BondContractDetails => "bondContractDetails",
        CommissionReport => "commissionReport",
        CompletedOrder => "completedOrder",
        CompletedOrdersEnd => "completedOrdersEnd",
        ContractDetails => "contractDetails",
        ContractDetailsEnd => "contractDetailsEnd",
        CurrentTime => "currentTime",
        DeltaNeutralValidation => "deltaNeutralValidation",
        DisplayGroupList => "displayGroupList",
        DisplayGroupUpdated => "displayGroupUpdated",
        ExecDetails => "execDetails",
        ExecDetailsEnd => "execDetailsEnd",
        FamilyCodes => "familyCodes",
        FundamentalData => "fundamentalData",
        HeadTimestamp => "headTimestamp",
        HistogramData => "histogramData",
        HistoricalData => "historicalData",
        HistoricalDataEnd => "historicalDataEnd",
        HistoricalDataUpdate => "historicalDataUpdate",
        HistoricalNews => "historicalNews",
        HistoricalNewsEnd => "historicalNewsEnd",
        HistoricalTicks => "historicalTicks",
        HistoricalTicksBidAsk => "historicalTicksBidAsk",
        HistoricalTicksLast => "historicalTicksLast",
        ManagedAccounts => "managedAccounts",
        MarketDataType => "marketDataType",
        MarketRule => "marketRule",
        MktDepthExchanges => "mktDepthExchanges",
        NewsArticle => "newsArticle",
        NewsProviders => "newsProviders",
        NextValidId => "nextValidId",
        OpenOrder => "openOrder",
        OpenOrderEnd => "openOrderEnd",
        OrderBound => "orderBound",
        OrderStatus => "orderStatus",
        Pnl => "pnl",
        PnlSingle => "pnlSingle",
        Position => "position",
        PositionEnd => "positionEnd",
        PositionMulti => "positionMulti",
        PositionMultiEnd => "positionMultiEnd",
        RealtimeBar => "realtimeBar",
        ReceiveFa => "receiveFA",
        RerouteMktDataReq => "rerouteMktDataReq",
        RerouteMktDepthReq => "rerouteMktDepthReq",
        ScannerData => "scannerData",
        ScannerDataEnd => "scannerDataEnd",
        ScannerParameters => "scannerParameters",
        SecurityDefinitionOptionParameter => "securityDefinitionOptionParameter",
        SecurityDefinitionOptionParameterEnd => "securityDefinitionOptionParameterEnd",
        SmartComponents => "smartComponents",
        SoftDollarTiers => "softDollarTiers",
        SymbolSamples => "symbolSamples",
        TickByTickAllLast => "tickByTickAllLast",
        TickByTickBidAsk => "tickByTickBidAsk",
        TickByTickMidPoint => "tickByTickMidPoint",
        TickEfp => "tickEFP",
        TickGeneric => "tickGeneric",
        TickNews => "tickNews",
        TickOptionComputation => "tickOptionComputation",
        TickPrice => "tickPrice",
        TickReqParams => "tickReqParams",
        TickSize => "tickSize",
        TickSnapshotEnd => "tickSnapshotEnd",
        TickString => "tickString",
        UpdateAccountTime => "updateAccountTime",
        UpdateAccountValue => "updateAccountValue",
        UpdateMktDepth => "updateMktDepth",
        UpdateMktDepthL2 => "updateMktDepthL2",
        UpdateNewsBulletin => "updateNewsBulletin",
        UpdatePortfolio => "updatePortfolio",
    }
}

/// Client-side plumbing: connection lifecycle, handshakes and the message loop.
pub const CLIENT_PLUMBING: &[&str] = &[
    "connect",
    "disconnect",
    "isConnected",
    "keyboardInterrupt",
    "keyboardInterruptHard",
    "logRequest",
    "reset",
    "run",
    "sendMsg",
    "serverVersion",
    "setConnState",
    "startApi",
    "twsConnectionTime",
    "verifyAndAuthMessage",
    "verifyAndAuthRequest",
    "verifyMessage",
    "verifyRequest",
];

/// Callback-side plumbing: acknowledgements, errors and handshake replies.
pub const WRAPPER_PLUMBING: &[&str] = &[
    "connectAck",
    "connectionClosed",
    "error",
    "logAnswer",
    "verifyAndAuthCompleted",
    "verifyAndAuthMessageAPI",
    "verifyCompleted",
    "verifyMessageAPI",
    "winError",
];

/// Every action name the targeted vendor API version exposes, plumbing included.
#[must_use]
pub fn vendor_surface() -> Vec<&'static str> {
    RequestAction::ALL
        .iter()
        .map(|a| a.as_str())
        .chain(EventKind::ALL.iter().map(|e| e.as_str()))
        .chain(CLIENT_PLUMBING.iter().copied())
        .chain(WRAPPER_PLUMBING.iter().copied())
        .collect()
}

/// Either side of the vocabulary, used where roles are reported together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Action {
    Request(RequestAction),
    Event(EventKind),
}

impl Action {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Action::Request(r) => r.as_str(),
            Action::Event(e) => e.as_str(),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<RequestAction> for Action {
    fn from(action: RequestAction) -> Self {
        Action::Request(action)
    }
}

impl From<EventKind> for Action {
    fn from(kind: EventKind) -> Self {
        Action::Event(kind)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn wire_names_round_trip_through_from_str() {
        for action in RequestAction::ALL {
            assert_eq!(action.as_str().parse::<RequestAction>().unwrap(), *action);
        }
        for kind in EventKind::ALL {
            assert_eq!(kind.as_str().parse::<EventKind>().unwrap(), *kind);
        }
    }

    #[test]
    fn unknown_name_is_rejected() {
        let err = "reqWshMetaData".parse::<RequestAction>().unwrap_err();
        assert_eq!(err, UnknownAction("reqWshMetaData".to_string()));
    }

    #[test]
    fn serde_uses_vendor_names() {
        let json = serde_json::to_string(&EventKind::TickEfp).unwrap();
        assert_eq!(json, "\"tickEFP\"");
        let back: RequestAction = serde_json::from_str("\"replaceFA\"").unwrap();
        assert_eq!(back, RequestAction::ReplaceFa);
    }

    #[test]
    fn vendor_surface_has_no_duplicate_names() {
        let surface = vendor_surface();
        let unique: HashSet<_> = surface.iter().collect();
        assert_eq!(unique.len(), surface.len());
    }

    #[test]
    fn action_display_matches_wire_name() {
        assert_eq!(Action::from(RequestAction::ReqMktData).to_string(), "reqMktData");
        assert_eq!(Action::from(EventKind::TickPrice).to_string(), "tickPrice");
    }
}
