use std::fmt;

/// A 32-bit OPC UA result code. The top two bits carry the severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StatusCode(pub u32);

const SEVERITY_MASK: u32 = 0xC000_0000;
const SYMBOL_MASK: u32 = 0xFFFF_0000;

static SYMBOLS: &[(u32, &str)] = &[
    (0x0000_0000, "Good"),
    (0x4000_0000, "Uncertain"),
    (0x8000_0000, "Bad"),
    (0x8001_0000, "BadUnexpectedError"),
    (0x8002_0000, "BadInternalError"),
    (0x8003_0000, "BadOutOfMemory"),
    (0x8004_0000, "BadResourceUnavailable"),
    (0x8005_0000, "BadCommunicationError"),
    (0x8006_0000, "BadEncodingError"),
    (0x8007_0000, "BadDecodingError"),
    (0x8008_0000, "BadEncodingLimitsExceeded"),
    (0x8009_0000, "BadRequestTooLarge"),
    (0x800A_0000, "BadTimeout"),
    (0x800B_0000, "BadServiceUnsupported"),
    (0x800D_0000, "BadShutdown"),
    (0x800E_0000, "BadServerNotConnected"),
    (0x800F_0000, "BadServerHalted"),
    (0x8010_0000, "BadNothingToDo"),
    (0x8012_0000, "BadTooManyOperations"),
    (0x8013_0000, "BadDataTypeIdUnknown"),
    (0x8014_0000, "BadCertificateInvalid"),
    (0x801F_0000, "BadUserAccessDenied"),
    (0x8031_0000, "BadNoCommunication"),
    (0x8032_0000, "BadWaitingForInitialData"),
    (0x8033_0000, "BadNodeIdInvalid"),
    (0x8034_0000, "BadNodeIdUnknown"),
    (0x8035_0000, "BadAttributeIdInvalid"),
    (0x8036_0000, "BadIndexRangeInvalid"),
    (0x8037_0000, "BadIndexRangeNoData"),
    (0x8038_0000, "BadDataEncodingInvalid"),
    (0x8039_0000, "BadDataEncodingUnsupported"),
    (0x803A_0000, "BadNotReadable"),
    (0x803B_0000, "BadNotWritable"),
    (0x803C_0000, "BadOutOfRange"),
    (0x803D_0000, "BadNotSupported"),
    (0x803E_0000, "BadNotFound"),
    (0x8074_0000, "BadTypeMismatch"),
    (0x808A_0000, "BadDeviceFailure"),
    (0x808B_0000, "BadSensorFailure"),
    (0x808D_0000, "BadOutOfService"),
    (0x80AB_0000, "BadInvalidArgument"),
    (0x80AC_0000, "BadConnectionRejected"),
    (0x80AD_0000, "BadDisconnect"),
    (0x80AE_0000, "BadConnectionClosed"),
    (0x80AF_0000, "BadInvalidState"),
    (0x408F_0000, "UncertainNoCommunicationLastUsableValue"),
    (0x4090_0000, "UncertainLastUsableValue"),
    (0x4091_0000, "UncertainSubstituteValue"),
    (0x4092_0000, "UncertainInitialValue"),
    (0x4093_0000, "UncertainSensorNotAccurate"),
    (0x4094_0000, "UncertainEngineeringUnitsExceeded"),
    (0x4095_0000, "UncertainSubNormal"),
    (0x002D_0000, "GoodSubscriptionTransferred"),
    (0x002E_0000, "GoodCompletesAsynchronously"),
    (0x002F_0000, "GoodOverload"),
    (0x0030_0000, "GoodClamped"),
    (0x0096_0000, "GoodLocalOverride"),
    (0x00A2_0000, "GoodNoData"),
    (0x00A3_0000, "GoodMoreData"),
    (0x00DC_0000, "GoodEntryInserted"),
    (0x00DD_0000, "GoodEntryReplaced"),
];

impl StatusCode {
    pub const GOOD: StatusCode = StatusCode(0);
    pub const UNCERTAIN: StatusCode = StatusCode(0x4000_0000);
    pub const BAD: StatusCode = StatusCode(0x8000_0000);

    pub fn code(self) -> u32 {
        self.0
    }

    pub fn is_good(self) -> bool {
        self.0 & SEVERITY_MASK == 0
    }

    pub fn is_uncertain(self) -> bool {
        self.0 & SEVERITY_MASK == 0x4000_0000
    }

    pub fn is_bad(self) -> bool {
        self.0 & SEVERITY_MASK == 0x8000_0000
    }

    /// The symbolic name of the code, ignoring the info bits.
    pub fn symbol(self) -> Option<&'static str> {
        let key = self.0 & SYMBOL_MASK;
        SYMBOLS
            .iter()
            .find(|(code, _)| *code == key)
            .map(|(_, name)| *name)
    }

    pub fn from_symbol(symbol: &str) -> Option<StatusCode> {
        SYMBOLS
            .iter()
            .find(|(_, name)| *name == symbol)
            .map(|(code, _)| StatusCode(*code))
    }
}

impl From<u32> for StatusCode {
    fn from(value: u32) -> Self {
        StatusCode(value)
    }
}

impl From<StatusCode> for u32 {
    fn from(value: StatusCode) -> Self {
        value.0
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.symbol() {
            Some(symbol) if self.0 & !SYMBOL_MASK == 0 => f.write_str(symbol),
            Some(symbol) => write!(f, "{} (0x{:08X})", symbol, self.0),
            None => write!(f, "0x{:08X}", self.0),
        }
    }
}
