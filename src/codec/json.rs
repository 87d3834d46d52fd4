//! OTLP/JSON mapping on top of the `opentelemetry-proto` serde derives.
//!
//! The derives cover field naming and hex ids, but not all of proto3 JSON:
//! non-finite doubles serialize as `null`, 64-bit integers only accept one of
//! the two permitted spellings, and some messages reject omitted fields.
//! Encoding goes through [`NonFinite`], which writes `"NaN"`, `"Infinity"`
//! and `"-Infinity"`. Decoding parses into a [`serde_json::Value`], rewrites
//! it into a [`Json`] tree guided by the message schema, then runs the typed
//! derive over that tree.

use serde::de::value::{MapDeserializer, SeqDeserializer};
use serde::de::{self, DeserializeOwned, IntoDeserializer, Visitor};
use serde::ser::{self, Serialize, Serializer};
use serde_json::Value;

/// Serializes `value` as OTLP/JSON.
pub(crate) fn to_vec<T: Serialize>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
    let mut out = Vec::new();
    let mut serializer = serde_json::Serializer::new(&mut out);
    value.serialize(NonFinite(&mut serializer))?;
    Ok(out)
}

/// Deserializes an OTLP/JSON document whose root message is `root`.
pub(crate) fn from_slice<T: DeserializeOwned>(
    bytes: &[u8],
    root: Shape,
) -> Result<T, serde_json::Error> {
    let value: Value = serde_json::from_slice(bytes)?;
    T::deserialize(Json::convert(value, Slot::One(root)))
}

fn non_finite_label(value: f64) -> &'static str {
    if value.is_nan() {
        "NaN"
    } else if value.is_sign_negative() {
        "-Infinity"
    } else {
        "Infinity"
    }
}

// Encoding

struct NonFinite<S>(S);

struct Wrapped<'a, T: ?Sized>(&'a T);

impl<T: Serialize + ?Sized> Serialize for Wrapped<'_, T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(NonFinite(serializer))
    }
}

struct Compound<C>(C);

macro_rules! forward_scalars {
    ($($method:ident($ty:ty)),* $(,)?) => {
        $(
            fn $method(self, v: $ty) -> Result<S::Ok, S::Error> {
                self.0.$method(v)
            }
        )*
    };
}

impl<S: Serializer> Serializer for NonFinite<S> {
    type Ok = S::Ok;
    type Error = S::Error;
    type SerializeSeq = Compound<S::SerializeSeq>;
    type SerializeTuple = Compound<S::SerializeTuple>;
    type SerializeTupleStruct = Compound<S::SerializeTupleStruct>;
    type SerializeTupleVariant = Compound<S::SerializeTupleVariant>;
    type SerializeMap = Compound<S::SerializeMap>;
    type SerializeStruct = Compound<S::SerializeStruct>;
    type SerializeStructVariant = Compound<S::SerializeStructVariant>;

    forward_scalars! {
        serialize_bool(bool),
        serialize_i8(i8),
        serialize_i16(i16),
        serialize_i32(i32),
        serialize_i64(i64),
        serialize_i128(i128),
        serialize_u8(u8),
        serialize_u16(u16),
        serialize_u32(u32),
        serialize_u64(u64),
        serialize_u128(u128),
        serialize_char(char),
        serialize_str(&str),
        serialize_bytes(&[u8]),
    }

    fn serialize_f32(self, v: f32) -> Result<S::Ok, S::Error> {
        if v.is_finite() {
            self.0.serialize_f32(v)
        } else {
            self.0.serialize_str(non_finite_label(f64::from(v)))
        }
    }

    fn serialize_f64(self, v: f64) -> Result<S::Ok, S::Error> {
        if v.is_finite() {
            self.0.serialize_f64(v)
        } else {
            self.0.serialize_str(non_finite_label(v))
        }
    }

    fn serialize_none(self) -> Result<S::Ok, S::Error> {
        self.0.serialize_none()
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<S::Ok, S::Error> {
        self.0.serialize_some(&Wrapped(value))
    }

    fn serialize_unit(self) -> Result<S::Ok, S::Error> {
        self.0.serialize_unit()
    }

    fn serialize_unit_struct(self, name: &'static str) -> Result<S::Ok, S::Error> {
        self.0.serialize_unit_struct(name)
    }

    fn serialize_unit_variant(
        self,
        name: &'static str,
        index: u32,
        variant: &'static str,
    ) -> Result<S::Ok, S::Error> {
        self.0.serialize_unit_variant(name, index, variant)
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        name: &'static str,
        value: &T,
    ) -> Result<S::Ok, S::Error> {
        self.0.serialize_newtype_struct(name, &Wrapped(value))
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        name: &'static str,
        index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<S::Ok, S::Error> {
        self.0
            .serialize_newtype_variant(name, index, variant, &Wrapped(value))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<Self::SerializeSeq, S::Error> {
        self.0.serialize_seq(len).map(Compound)
    }

    fn serialize_tuple(self, len: usize) -> Result<Self::SerializeTuple, S::Error> {
        self.0.serialize_tuple(len).map(Compound)
    }

    fn serialize_tuple_struct(
        self,
        name: &'static str,
        len: usize,
    ) -> Result<Self::SerializeTupleStruct, S::Error> {
        self.0.serialize_tuple_struct(name, len).map(Compound)
    }

    fn serialize_tuple_variant(
        self,
        name: &'static str,
        index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<Self::SerializeTupleVariant, S::Error> {
        self.0
            .serialize_tuple_variant(name, index, variant, len)
            .map(Compound)
    }

    fn serialize_map(self, len: Option<usize>) -> Result<Self::SerializeMap, S::Error> {
        self.0.serialize_map(len).map(Compound)
    }

    fn serialize_struct(
        self,
        name: &'static str,
        len: usize,
    ) -> Result<Self::SerializeStruct, S::Error> {
        self.0.serialize_struct(name, len).map(Compound)
    }

    fn serialize_struct_variant(
        self,
        name: &'static str,
        index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<Self::SerializeStructVariant, S::Error> {
        self.0
            .serialize_struct_variant(name, index, variant, len)
            .map(Compound)
    }

    fn is_human_readable(&self) -> bool {
        self.0.is_human_readable()
    }
}

impl<C: ser::SerializeSeq> ser::SerializeSeq for Compound<C> {
    type Ok = C::Ok;
    type Error = C::Error;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), C::Error> {
        self.0.serialize_element(&Wrapped(value))
    }

    fn end(self) -> Result<C::Ok, C::Error> {
        self.0.end()
    }
}

impl<C: ser::SerializeTuple> ser::SerializeTuple for Compound<C> {
    type Ok = C::Ok;
    type Error = C::Error;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), C::Error> {
        self.0.serialize_element(&Wrapped(value))
    }

    fn end(self) -> Result<C::Ok, C::Error> {
        self.0.end()
    }
}

impl<C: ser::SerializeTupleStruct> ser::SerializeTupleStruct for Compound<C> {
    type Ok = C::Ok;
    type Error = C::Error;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), C::Error> {
        self.0.serialize_field(&Wrapped(value))
    }

    fn end(self) -> Result<C::Ok, C::Error> {
        self.0.end()
    }
}

impl<C: ser::SerializeTupleVariant> ser::SerializeTupleVariant for Compound<C> {
    type Ok = C::Ok;
    type Error = C::Error;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), C::Error> {
        self.0.serialize_field(&Wrapped(value))
    }

    fn end(self) -> Result<C::Ok, C::Error> {
        self.0.end()
    }
}

impl<C: ser::SerializeMap> ser::SerializeMap for Compound<C> {
    type Ok = C::Ok;
    type Error = C::Error;

    fn serialize_key<T: Serialize + ?Sized>(&mut self, key: &T) -> Result<(), C::Error> {
        self.0.serialize_key(&Wrapped(key))
    }

    fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), C::Error> {
        self.0.serialize_value(&Wrapped(value))
    }

    fn serialize_entry<K: Serialize + ?Sized, V: Serialize + ?Sized>(
        &mut self,
        key: &K,
        value: &V,
    ) -> Result<(), C::Error> {
        self.0.serialize_entry(&Wrapped(key), &Wrapped(value))
    }

    fn end(self) -> Result<C::Ok, C::Error> {
        self.0.end()
    }
}

impl<C: ser::SerializeStruct> ser::SerializeStruct for Compound<C> {
    type Ok = C::Ok;
    type Error = C::Error;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), C::Error> {
        self.0.serialize_field(key, &Wrapped(value))
    }

    fn skip_field(&mut self, key: &'static str) -> Result<(), C::Error> {
        self.0.skip_field(key)
    }

    fn end(self) -> Result<C::Ok, C::Error> {
        self.0.end()
    }
}

impl<C: ser::SerializeStructVariant> ser::SerializeStructVariant for Compound<C> {
    type Ok = C::Ok;
    type Error = C::Error;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), C::Error> {
        self.0.serialize_field(key, &Wrapped(value))
    }

    fn skip_field(&mut self, key: &'static str) -> Result<(), C::Error> {
        self.0.skip_field(key)
    }

    fn end(self) -> Result<C::Ok, C::Error> {
        self.0.end()
    }
}

// Decoding

/// OTLP messages whose JSON fields need rewriting before deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Shape {
    ExportLogs,
    ExportMetrics,
    ExportTraces,
    ResourceLogs,
    ResourceMetrics,
    ResourceSpans,
    ScopeLogs,
    ScopeMetrics,
    ScopeSpans,
    Resource,
    Scope,
    LogRecord,
    Metric,
    /// Gauge or Sum.
    NumberSeries,
    Histogram,
    ExponentialHistogram,
    Summary,
    NumberDataPoint,
    HistogramDataPoint,
    ExponentialHistogramDataPoint,
    Buckets,
    SummaryDataPoint,
    ValueAtQuantile,
    Exemplar,
    Span,
    SpanEvent,
    SpanLink,
    KeyValue,
    AnyValue,
    ArrayValue,
    KeyValueList,
}

/// What a JSON field holds.
#[derive(Debug, Clone, Copy)]
enum Slot {
    One(Shape),
    Many(Shape),
    Number(Number),
    Numbers(Number),
    Verbatim,
}

/// Scalar fields with more than one accepted JSON spelling.
#[derive(Debug, Clone, Copy)]
enum Number {
    Double,
    /// 64-bit integer the derive reads only from a string.
    U64AsString,
    /// 64-bit integer the derive reads only from a number.
    U64,
    I64,
}

/// Default written for a field the derive requires but proto3 JSON may omit.
#[derive(Debug, Clone, Copy)]
enum Fill {
    List,
    Zero,
    Empty,
}

fn slot(shape: Shape, key: &str) -> Slot {
    use Number::{Double, I64, U64, U64AsString};
    use Shape as S;
    use Slot::{Many, Number as N, Numbers as Ns, One};

    match (shape, key) {
        (S::ExportLogs, "resourceLogs") => Many(S::ResourceLogs),
        (S::ExportMetrics, "resourceMetrics") => Many(S::ResourceMetrics),
        (S::ExportTraces, "resourceSpans") => Many(S::ResourceSpans),
        (S::ResourceLogs | S::ResourceMetrics | S::ResourceSpans, "resource") => One(S::Resource),
        (S::ResourceLogs, "scopeLogs") => Many(S::ScopeLogs),
        (S::ResourceMetrics, "scopeMetrics") => Many(S::ScopeMetrics),
        (S::ResourceSpans, "scopeSpans") => Many(S::ScopeSpans),
        (S::ScopeLogs | S::ScopeMetrics | S::ScopeSpans, "scope") => One(S::Scope),
        (S::ScopeLogs, "logRecords") => Many(S::LogRecord),
        (S::ScopeMetrics, "metrics") => Many(S::Metric),
        (S::ScopeSpans, "spans") => Many(S::Span),

        (S::LogRecord, "timeUnixNano" | "observedTimeUnixNano") => N(U64AsString),
        (S::LogRecord, "body") => One(S::AnyValue),

        (S::Metric, "gauge" | "sum") => One(S::NumberSeries),
        (S::Metric, "histogram") => One(S::Histogram),
        (S::Metric, "exponentialHistogram") => One(S::ExponentialHistogram),
        (S::Metric, "summary") => One(S::Summary),
        (S::Metric, "metadata") => Many(S::KeyValue),
        (S::NumberSeries, "dataPoints") => Many(S::NumberDataPoint),
        (S::Histogram, "dataPoints") => Many(S::HistogramDataPoint),
        (S::ExponentialHistogram, "dataPoints") => Many(S::ExponentialHistogramDataPoint),
        (S::Summary, "dataPoints") => Many(S::SummaryDataPoint),

        (S::NumberDataPoint | S::HistogramDataPoint, "startTimeUnixNano" | "timeUnixNano") => {
            N(U64AsString)
        }
        (
            S::ExponentialHistogramDataPoint | S::SummaryDataPoint,
            "startTimeUnixNano" | "timeUnixNano" | "count",
        ) => N(U64),
        (S::NumberDataPoint | S::Exemplar, "asDouble") => N(Double),
        (S::NumberDataPoint | S::Exemplar, "asInt") => N(I64),
        (S::HistogramDataPoint, "count") => N(U64),
        (S::HistogramDataPoint | S::Buckets, "bucketCounts") => Ns(U64),
        (S::HistogramDataPoint, "explicitBounds") => Ns(Double),
        (S::HistogramDataPoint | S::ExponentialHistogramDataPoint, "sum" | "min" | "max") => {
            N(Double)
        }
        (S::ExponentialHistogramDataPoint, "zeroCount") => N(U64),
        (S::ExponentialHistogramDataPoint, "zeroThreshold") => N(Double),
        (S::ExponentialHistogramDataPoint, "positive" | "negative") => One(S::Buckets),
        (
            S::NumberDataPoint | S::HistogramDataPoint | S::ExponentialHistogramDataPoint,
            "exemplars",
        ) => Many(S::Exemplar),
        (S::SummaryDataPoint, "sum") => N(Double),
        (S::SummaryDataPoint, "quantileValues") => Many(S::ValueAtQuantile),
        (S::ValueAtQuantile, "quantile" | "value") => N(Double),
        (S::Exemplar, "timeUnixNano") => N(U64),
        (S::Exemplar, "filteredAttributes") => Many(S::KeyValue),

        (S::Span, "startTimeUnixNano" | "endTimeUnixNano") => N(U64AsString),
        (S::Span, "events") => Many(S::SpanEvent),
        (S::Span, "links") => Many(S::SpanLink),
        (S::SpanEvent, "timeUnixNano") => N(U64AsString),

        (S::KeyValue, "value") => One(S::AnyValue),
        (S::AnyValue, "doubleValue") => N(Double),
        (S::AnyValue, "arrayValue") => One(S::ArrayValue),
        (S::AnyValue, "kvlistValue") => One(S::KeyValueList),
        (S::ArrayValue, "values") => Many(S::AnyValue),
        (S::KeyValueList, "values") => Many(S::KeyValue),
        (_, "attributes") => Many(S::KeyValue),
        _ => Slot::Verbatim,
    }
}

/// Fields of messages derived without `#[serde(default)]`.
fn required(shape: Shape) -> &'static [(&'static str, Fill)] {
    use Fill::{Empty, List, Zero};

    match shape {
        Shape::ExportLogs => &[("resourceLogs", List)],
        Shape::ExportMetrics => &[("resourceMetrics", List)],
        Shape::ExportTraces => &[("resourceSpans", List)],
        Shape::ExponentialHistogramDataPoint => &[
            ("attributes", List),
            ("startTimeUnixNano", Zero),
            ("timeUnixNano", Zero),
            ("count", Zero),
            ("scale", Zero),
            ("zeroCount", Zero),
            ("flags", Zero),
            ("exemplars", List),
            ("zeroThreshold", Zero),
        ],
        Shape::Buckets => &[("offset", Zero), ("bucketCounts", List)],
        Shape::SummaryDataPoint => &[
            ("attributes", List),
            ("startTimeUnixNano", Zero),
            ("timeUnixNano", Zero),
            ("count", Zero),
            ("sum", Zero),
            ("quantileValues", List),
            ("flags", Zero),
        ],
        Shape::ValueAtQuantile => &[("quantile", Zero), ("value", Zero)],
        Shape::Exemplar => &[
            ("filteredAttributes", List),
            ("timeUnixNano", Zero),
            ("spanId", Empty),
            ("traceId", Empty),
        ],
        Shape::KeyValue => &[("key", Empty)],
        Shape::ArrayValue | Shape::KeyValueList => &[("values", List)],
        _ => &[],
    }
}

/// JSON tree that, unlike [`Value`], can carry non-finite doubles.
#[derive(Debug, Clone, PartialEq)]
enum Json {
    Null,
    Bool(bool),
    U64(u64),
    I64(i64),
    F64(f64),
    Str(String),
    Array(Vec<Json>),
    Object(Vec<(String, Json)>),
}

impl Json {
    fn convert(value: Value, slot: Slot) -> Self {
        match (slot, value) {
            (Slot::One(shape), Value::Object(map)) => {
                let mut entries: Vec<(String, Json)> = map
                    .into_iter()
                    .map(|(key, value)| {
                        let slot = self::slot(shape, &key);
                        (key, Json::convert(value, slot))
                    })
                    .collect();
                for (key, fill) in required(shape) {
                    if !entries.iter().any(|(present, _)| present == key) {
                        entries.push(((*key).to_string(), fill.value()));
                    }
                }
                Json::Object(entries)
            }
            (Slot::Many(shape), Value::Array(items)) => Json::Array(
                items
                    .into_iter()
                    .map(|item| Json::convert(item, Slot::One(shape)))
                    .collect(),
            ),
            (Slot::Number(number), value) => Json::number(value, number),
            (Slot::Numbers(number), Value::Array(items)) => Json::Array(
                items
                    .into_iter()
                    .map(|item| Json::number(item, number))
                    .collect(),
            ),
            (_, value) => Json::from(value),
        }
    }

    fn number(value: Value, number: Number) -> Self {
        match (number, value) {
            (Number::Double, Value::String(text)) => match text.as_str() {
                "NaN" => Json::F64(f64::NAN),
                "Infinity" => Json::F64(f64::INFINITY),
                "-Infinity" => Json::F64(f64::NEG_INFINITY),
                _ => match text.parse::<f64>() {
                    Ok(v) if v.is_finite() => Json::F64(v),
                    _ => Json::Str(text),
                },
            },
            (Number::U64AsString, Value::Number(n)) => match n.as_u64() {
                Some(v) => Json::Str(v.to_string()),
                None => Json::from(Value::Number(n)),
            },
            (Number::U64, Value::String(text)) => match text.parse::<u64>() {
                Ok(v) => Json::U64(v),
                Err(_) => Json::Str(text),
            },
            (Number::I64, Value::String(text)) => match text.parse::<i64>() {
                Ok(v) => Json::I64(v),
                Err(_) => Json::Str(text),
            },
            (_, value) => Json::from(value),
        }
    }
}

impl Fill {
    fn value(self) -> Json {
        match self {
            Fill::List => Json::Array(Vec::new()),
            Fill::Zero => Json::U64(0),
            Fill::Empty => Json::Str(String::new()),
        }
    }
}

impl From<Value> for Json {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(b),
            Value::Number(n) => {
                if let Some(v) = n.as_u64() {
                    Json::U64(v)
                } else if let Some(v) = n.as_i64() {
                    Json::I64(v)
                } else {
                    n.as_f64().map_or(Json::Null, Json::F64)
                }
            }
            Value::String(s) => Json::Str(s),
            Value::Array(items) => Json::Array(items.into_iter().map(Json::from).collect()),
            Value::Object(map) => Json::Object(
                map.into_iter()
                    .map(|(key, value)| (key, Json::from(value)))
                    .collect(),
            ),
        }
    }
}

impl<'de> de::Deserializer<'de> for Json {
    type Error = serde_json::Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self {
            Json::Null => visitor.visit_unit(),
            Json::Bool(b) => visitor.visit_bool(b),
            Json::U64(v) => visitor.visit_u64(v),
            Json::I64(v) => visitor.visit_i64(v),
            Json::F64(v) => visitor.visit_f64(v),
            Json::Str(s) => visitor.visit_string(s),
            Json::Array(items) => {
                let mut seq: SeqDeserializer<_, Self::Error> =
                    SeqDeserializer::new(items.into_iter());
                let value = visitor.visit_seq(&mut seq)?;
                seq.end()?;
                Ok(value)
            }
            Json::Object(entries) => {
                let mut map: MapDeserializer<'de, _, Self::Error> =
                    MapDeserializer::new(entries.into_iter());
                let value = visitor.visit_map(&mut map)?;
                map.end()?;
                Ok(value)
            }
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self {
            Json::Null => visitor.visit_none(),
            other => visitor.visit_some(other),
        }
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_newtype_struct(self)
    }

    serde::forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf unit unit_struct seq tuple tuple_struct map struct enum
        identifier ignored_any
    }
}

impl<'de> IntoDeserializer<'de, serde_json::Error> for Json {
    type Deserializer = Self;

    fn into_deserializer(self) -> Self {
        self
    }
}
