//! Built-in classification of the gateway API.
//!
//! One descriptor per vendor operation family, grouped by domain. The
//! coverage verifier checks this table against the vendor's exposed surface.

use crate::action::{EventKind as E, RequestAction as R};
use crate::descriptor::{CancelAck, OperationDescriptor as Op};

/// Name of the unsolicited order stream (order lifecycle pushed by the vendor).
pub const ORDER_EVENTS: &str = "orderEvents";
pub const COMMISSION_REPORTS: &str = "commissionReport";
pub const MARKET_DATA_TYPE: &str = "marketDataType";

/// The full vendor table, in registration order.
#[must_use]
#[allow(clippy::too_many_lines)]
pub fn descriptors() -> Vec<Op> {
    vec![
        // ----- Market data -----

        Op::request(R::ReqMktData)
            .callbacks([
                E::TickPrice,
                E::TickSize,
                E::TickString,
                E::TickGeneric,
                E::TickEfp,
                E::TickNews,
                E::RerouteMktDataReq,
                E::RerouteMktDepthReq,
                E::TickReqParams,
                E::DeltaNeutralValidation,
            ])
            .cancel(R::CancelMktData)
            .terminator(E::TickSnapshotEnd)
            .subscription_when("snapshot", false)
            .with_identifier(),
        Op::request(R::ReqMktDepth)
            .callbacks([E::UpdateMktDepth, E::UpdateMktDepthL2])
            .cancel(R::CancelMktDepth)
            .subscription()
            .with_identifier(),
        Op::request(R::ReqRealTimeBars)
            .callbacks([E::RealtimeBar])
            .cancel(R::CancelRealTimeBars)
            .subscription()
            .with_identifier(),
        Op::request(R::ReqTickByTickData)
            .callbacks([E::TickByTickAllLast, E::TickByTickBidAsk, E::TickByTickMidPoint])
            .cancel(R::CancelTickByTickData)
            .subscription()
            .with_identifier(),
        Op::request(R::ReqMarketDataType),
        Op::request(R::ReqMktDepthExchanges).callbacks([E::MktDepthExchanges]),
        Op::request(R::ReqSmartComponents)
            .callbacks([E::SmartComponents])
            .with_identifier(),
        Op::request(R::ReqMarketRule).callbacks([E::MarketRule]),
        Op::unsolicited(MARKET_DATA_TYPE, [E::MarketDataType]),

        // ----- Historical data -----

        Op::request(R::ReqHistoricalData)
            .callbacks([E::HistoricalData, E::HistoricalDataUpdate])
            .cancel(R::CancelHistoricalData)
            .terminator(E::HistoricalDataEnd)
            .subscription_when("keepUpToDate", true)
            .with_identifier(),
        Op::request(R::ReqHistoricalTicks)
            .callbacks([E::HistoricalTicks, E::HistoricalTicksBidAsk, E::HistoricalTicksLast])
            .with_identifier()
            .with_done_flag(),
        Op::request(R::ReqHeadTimeStamp)
            .callbacks([E::HeadTimestamp])
            .cancel(R::CancelHeadTimeStamp)
            .with_identifier(),
        Op::request(R::ReqHistogramData)
            .callbacks([E::HistogramData])
            .cancel(R::CancelHistogramData)
            .with_identifier(),

        // ----- Options -----

        // Both calculations report through tickOptionComputation; the
        // identifier tells them apart.
        Op::request(R::CalculateImpliedVolatility)
            .callbacks([E::TickOptionComputation])
            .cancel(R::CancelCalculateImpliedVolatility)
            .subscription()
            .with_identifier(),
        Op::request(R::CalculateOptionPrice)
            .callbacks([E::TickOptionComputation])
            .cancel(R::CancelCalculateOptionPrice)
            .subscription()
            .with_identifier(),
        Op::request(R::ExerciseOptions).with_identifier(),
        Op::request(R::ReqSecDefOptParams)
            .callbacks([E::SecurityDefinitionOptionParameter])
            .terminator(E::SecurityDefinitionOptionParameterEnd)
            .with_identifier(),

        // ----- Contracts & reference data -----

        Op::request(R::ReqContractDetails)
            .callbacks([E::ContractDetails, E::BondContractDetails])
            .terminator(E::ContractDetailsEnd)
            .with_identifier(),
        Op::request(R::ReqMatchingSymbols).callbacks([E::SymbolSamples]),
        Op::request(R::ReqFamilyCodes).callbacks([E::FamilyCodes]),
        Op::request(R::ReqSoftDollarTiers)
            .callbacks([E::SoftDollarTiers])
            .with_identifier(),
        Op::request(R::ReqFundamentalData)
            .callbacks([E::FundamentalData])
            .cancel(R::CancelFundamentalData)
            .with_identifier(),

        // ----- Scanner -----

        Op::request(R::ReqScannerSubscription)
            .callbacks([E::ScannerData])
            .cancel(R::CancelScannerSubscription)
            .terminator(E::ScannerDataEnd)
            .with_identifier(),
        Op::request(R::ReqScannerParameters).callbacks([E::ScannerParameters]),

        // ----- Orders -----

        // cancelOrder is confirmed by an error tuple carrying the order id, so
        // the operation stays Cancelling until that arrives.
        Op::request(R::PlaceOrder)
            .callbacks([E::OrderStatus])
            .cancel(R::CancelOrder)
            .cancel_ack(CancelAck::AwaitTerminal)
            .subscription()
            .with_identifier(),
        Op::request(R::ReqOpenOrders),
        Op::request(R::ReqAllOpenOrders),
        Op::request(R::ReqAutoOpenOrders),
        Op::request(R::ReqGlobalCancel),
        Op::request(R::ReqCompletedOrders)
            .callbacks([E::CompletedOrder])
            .terminator(E::CompletedOrdersEnd),
        Op::request(R::ReqExecutions)
            .callbacks([E::ExecDetails])
            .terminator(E::ExecDetailsEnd)
            .with_identifier(),
        Op::request(R::ReqIds).callbacks([E::NextValidId]),
        Op::unsolicited(
            ORDER_EVENTS,
            [E::OrderBound, E::OrderStatus, E::OpenOrder, E::OpenOrderEnd],
        ),
        Op::unsolicited(COMMISSION_REPORTS, [E::CommissionReport]),

        // ----- Account & portfolio -----

        Op::request(R::ReqAccountSummary)
            .callbacks([E::AccountSummary])
            .cancel(R::CancelAccountSummary)
            .terminator(E::AccountSummaryEnd)
            .with_identifier(),
        Op::request(R::ReqAccountUpdates)
            .callbacks([E::UpdateAccountValue, E::UpdateAccountTime, E::UpdatePortfolio])
            .terminator(E::AccountDownloadEnd),
        Op::request(R::ReqAccountUpdatesMulti)
            .callbacks([E::AccountUpdateMulti])
            .cancel(R::CancelAccountUpdatesMulti)
            .terminator(E::AccountUpdateMultiEnd)
            .with_identifier(),
        Op::request(R::ReqPositions)
            .callbacks([E::Position])
            .cancel(R::CancelPositions)
            .terminator(E::PositionEnd),
        Op::request(R::ReqPositionsMulti)
            .callbacks([E::PositionMulti])
            .cancel(R::CancelPositionsMulti)
            .terminator(E::PositionMultiEnd)
            .with_identifier(),
        Op::request(R::ReqPnL)
            .callbacks([E::Pnl])
            .cancel(R::CancelPnL)
            .with_identifier(),
        Op::request(R::ReqPnLSingle)
            .callbacks([E::PnlSingle])
            .cancel(R::CancelPnLSingle)
            .with_identifier(),
        Op::request(R::ReqManagedAccts).callbacks([E::ManagedAccounts]),

        // ----- News -----

        Op::request(R::ReqNewsBulletins)
            .callbacks([E::UpdateNewsBulletin])
            .cancel(R::CancelNewsBulletins)
            .subscription(),
        Op::request(R::ReqHistoricalNews)
            .callbacks([E::HistoricalNews])
            .terminator(E::HistoricalNewsEnd)
            .with_identifier(),
        Op::request(R::ReqNewsArticle).callbacks([E::NewsArticle]),
        Op::request(R::ReqNewsProviders).callbacks([E::NewsProviders]),

        // ----- Financial advisor -----

        Op::request(R::RequestFa).callbacks([E::ReceiveFa]),
        Op::request(R::ReplaceFa).with_identifier(),

        // ----- Display groups -----

        Op::request(R::QueryDisplayGroups)
            .callbacks([E::DisplayGroupList])
            .with_identifier(),
        Op::request(R::SubscribeToGroupEvents)
            .callbacks([E::DisplayGroupUpdated])
            .cancel(R::UnsubscribeFromGroupEvents)
            .subscription()
            .with_identifier(),
        Op::request(R::UpdateDisplayGroup),

        // ----- Server -----

        Op::request(R::ReqCurrentTime).callbacks([E::CurrentTime]),
        Op::request(R::SetServerLogLevel),
    ]
}
