//! Pseudo-parameters: implicitly available values that are never declared in a
//! template document.
//!
//! No deployed stack is queried, so every pseudo-parameter has a documented
//! stand-in value. Callers may override any of them.
//!
//! | Name                     | Default                                    |
//! |--------------------------|--------------------------------------------|
//! | `AWS::AccountId`         | `123456789012`                             |
//! | `AWS::NotificationARNs`  | empty list                                 |
//! | `AWS::NoValue`           | null                                       |
//! | `AWS::Partition`         | derived from the region (`aws`, `aws-cn`, `aws-us-gov`) |
//! | `AWS::Region`            | `us-east-1`                                |
//! | `AWS::StackId`           | stack ARN built from region, account and stack name |
//! | `AWS::StackName`         | `strata`                                   |
//! | `AWS::URLSuffix`         | `amazonaws.com` (`amazonaws.com.cn` in China regions) |

use std::fmt;

use indexmap::IndexMap;

use crate::value::Value;

const DEFAULT_ACCOUNT_ID: &str = "123456789012";
const DEFAULT_REGION: &str = "us-east-1";
const DEFAULT_STACK_NAME: &str = "strata";

/// The fixed catalog of pseudo-parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PseudoParameter {
    AccountId,
    NotificationArns,
    NoValue,
    Partition,
    Region,
    StackId,
    StackName,
    UrlSuffix,
}

impl PseudoParameter {
    const ALL: [PseudoParameter; 8] = [
        PseudoParameter::AccountId,
        PseudoParameter::NotificationArns,
        PseudoParameter::NoValue,
        PseudoParameter::Partition,
        PseudoParameter::Region,
        PseudoParameter::StackId,
        PseudoParameter::StackName,
        PseudoParameter::UrlSuffix,
    ];

    pub fn all() -> &'static [PseudoParameter] {
        &Self::ALL
    }

    pub fn name(&self) -> &'static str {
        match self {
            PseudoParameter::AccountId => "AWS::AccountId",
            PseudoParameter::NotificationArns => "AWS::NotificationARNs",
            PseudoParameter::NoValue => "AWS::NoValue",
            PseudoParameter::Partition => "AWS::Partition",
            PseudoParameter::Region => "AWS::Region",
            PseudoParameter::StackId => "AWS::StackId",
            PseudoParameter::StackName => "AWS::StackName",
            PseudoParameter::UrlSuffix => "AWS::URLSuffix",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|p| p.name() == name)
    }
}

impl fmt::Display for PseudoParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Pseudo-parameter values in effect for one evaluation.
#[derive(Debug, Clone, Default)]
pub struct PseudoParameters {
    overrides: IndexMap<PseudoParameter, Value>,
}

impl PseudoParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the value of a pseudo-parameter.
    pub fn with_value(mut self, parameter: PseudoParameter, value: Value) -> Self {
        self.overrides.insert(parameter, value);
        self
    }

    /// Returns the value of `parameter`: the override if one was supplied,
    /// otherwise the documented default.
    pub fn value(&self, parameter: PseudoParameter) -> Value {
        if let Some(value) = self.overrides.get(&parameter) {
            return value.clone();
        }
        match parameter {
            PseudoParameter::AccountId => Value::string(DEFAULT_ACCOUNT_ID),
            PseudoParameter::NotificationArns => Value::List(Vec::new()),
            PseudoParameter::NoValue => Value::null(),
            PseudoParameter::Region => Value::string(DEFAULT_REGION),
            PseudoParameter::StackName => Value::string(DEFAULT_STACK_NAME),
            PseudoParameter::Partition => Value::string(partition_for(&self.region())),
            PseudoParameter::UrlSuffix => {
                if self.region().starts_with("cn-") {
                    Value::string("amazonaws.com.cn")
                } else {
                    Value::string("amazonaws.com")
                }
            }
            PseudoParameter::StackId => Value::string(format!(
                "arn:{}:cloudformation:{}:{}:stack/{}/00000000-0000-0000-0000-000000000000",
                partition_for(&self.region()),
                self.region(),
                self.text(PseudoParameter::AccountId),
                self.text(PseudoParameter::StackName),
            )),
        }
    }

    /// The effective region name.
    pub fn region(&self) -> String {
        self.text(PseudoParameter::Region)
    }

    fn text(&self, parameter: PseudoParameter) -> String {
        self.value(parameter).as_text().unwrap_or_default()
    }
}

fn partition_for(region: &str) -> &'static str {
    if region.starts_with("cn-") {
        "aws-cn"
    } else if region.starts_with("us-gov-") {
        "aws-us-gov"
    } else {
        "aws"
    }
}
