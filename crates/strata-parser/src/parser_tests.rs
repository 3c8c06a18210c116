//! End-to-end tests for the template parsing pipeline.
//!
//! These tests drive [`crate::parse`] with complete documents and check the
//! resulting model as well as the error category of rejected documents.

use strata_core::{
    identifier::Id,
    intrinsic::{Intrinsic, Reference, Tag},
    value::{Operand, Scalar, Value},
};

use crate::{
    error::{ErrorCode, ErrorKind, ParseError},
    parse,
};

/// Helper to parse a source string and assert success
fn assert_parses(source: &str) -> strata_core::template::Template {
    match parse(source) {
        Ok(template) => template,
        Err(err) => panic!("Expected parsing to succeed, but got error: {err}"),
    }
}

/// Helper to parse a source string and return its error
fn assert_parse_fails(source: &str) -> ParseError {
    match parse(source) {
        Ok(_) => panic!("Expected parsing to fail, but it succeeded"),
        Err(err) => err,
    }
}

fn property<'t>(
    template: &'t strata_core::template::Template,
    resource: &str,
    name: &str,
) -> &'t Operand {
    template
        .resource(Id::new(resource))
        .and_then(|r| r.property(name))
        .unwrap_or_else(|| panic!("missing property {resource}.{name}"))
}

#[test]
fn test_minimal_template() {
    let template = assert_parses(
        r#"
AWSTemplateFormatVersion: "2010-09-09"
Description: Minimal
Resources:
  Bucket:
    Type: AWS::S3::Bucket
"#,
    );

    assert_eq!(template.format_version(), Some("2010-09-09"));
    assert_eq!(template.description(), Some("Minimal"));
    assert_eq!(
        template.resource(Id::new("Bucket")).map(|r| r.resource_type()),
        Some("AWS::S3::Bucket")
    );
}

#[test]
fn test_json_document() {
    let template = assert_parses(
        r#"{
  "Resources": {
    "Queue": {
      "Type": "AWS::SQS::Queue",
      "Properties": {"QueueName": {"Fn::Join": ["-", [{"Ref": "AWS::StackName"}, "jobs"]]}}
    }
  }
}"#,
    );

    let name = property(&template, "Queue", "QueueName");
    assert_eq!(
        name,
        &Operand::intrinsic(Intrinsic::Join {
            delimiter: Operand::string("-"),
            values: Operand::List(vec![
                Operand::intrinsic(Intrinsic::Ref(Id::new("AWS::StackName"))),
                Operand::string("jobs"),
            ]),
        })
    );
}

#[test]
fn test_short_and_long_forms_build_equal_models() {
    let short = assert_parses(
        r#"
Resources:
  Topic:
    Type: AWS::SNS::Topic
    Properties:
      Name: !Select [0, !Split [",", !Join [",", [a, !GetAtt Queue.Arn]]]]
      Encoded: !Base64 {"Fn::Sub": "${AWS::Region}-x"}
"#,
    );
    let long = assert_parses(
        r#"
Resources:
  Topic:
    Type: AWS::SNS::Topic
    Properties:
      Name:
        Fn::Select:
          - 0
          - Fn::Split: [",", {"Fn::Join": [",", [a, {"Fn::GetAtt": [Queue, Arn]}]]}]
      Encoded:
        Fn::Base64: !Sub "${AWS::Region}-x"
"#,
    );

    assert_eq!(short.resources(), long.resources());
}

#[test]
fn test_parameters_and_mappings() {
    let template = assert_parses(
        r#"
Parameters:
  Env:
    Type: String
    Default: dev
    AllowedValues: [dev, prod]
    Description: Deployment stage
  Password:
    Type: String
    NoEcho: "true"
    MinLength: 8
Mappings:
  RegionMap:
    us-east-1:
      Ami: ami-1
      Zones: [a, b]
Resources:
  Instance:
    Type: AWS::EC2::Instance
    Properties:
      ImageId: !FindInMap [RegionMap, !Ref "AWS::Region", Ami]
"#,
    );

    let env = template.parameter(Id::new("Env")).unwrap();
    assert_eq!(env.default(), Some(&Scalar::from("dev")));
    assert_eq!(env.allowed_values().len(), 2);
    assert!(template.parameter(Id::new("Password")).unwrap().no_echo());

    let mapping = template.mapping(Id::new("RegionMap")).unwrap();
    assert_eq!(mapping.lookup("us-east-1", "Ami").unwrap(), &Value::string("ami-1"));
    assert_eq!(
        mapping.lookup("us-east-1", "Zones").unwrap(),
        &Value::List(vec![Value::string("a"), Value::string("b")])
    );
}

#[test]
fn test_resource_attributes() {
    let template = assert_parses(
        r#"
Conditions:
  IsProd: !Equals [!Ref Env, prod]
Parameters:
  Env: {Type: String}
Resources:
  Table:
    Type: AWS::DynamoDB::Table
    Condition: IsProd
    DependsOn: Bucket
    DeletionPolicy: Retain
    Metadata:
      Owner: !Ref Env
  Bucket:
    Type: AWS::S3::Bucket
    DependsOn: [Table2]
  Table2:
    Type: AWS::DynamoDB::Table
"#,
    );

    let table = template.resource(Id::new("Table")).unwrap();
    assert_eq!(table.condition(), Some(Id::new("IsProd")));
    assert_eq!(table.depends_on(), &[Id::new("Bucket")]);
    assert_eq!(table.deletion_policy(), Some("Retain"));
    assert!(table.metadata().is_some());

    let bucket = template.resource(Id::new("Bucket")).unwrap();
    assert_eq!(bucket.depends_on(), &[Id::new("Table2")]);
}

#[test]
fn test_condition_key_context() {
    let template = assert_parses(
        r#"
Conditions:
  A: !Equals [x, x]
  B: !Equals [x, y]
  Both: {"Fn::And": [{Condition: A}, {Condition: B}]}
Resources:
  Policy:
    Type: AWS::IAM::ManagedPolicy
    Properties:
      PolicyDocument:
        Statement:
          - Effect: Allow
            Condition: {StringEquals: {"aws:RequestedRegion": us-east-1}}
      Enabled: !If [Both, !Or [{Condition: A}, !Condition B], false]
"#,
    );

    let both = template.condition(Id::new("Both")).unwrap().expression();
    assert_eq!(
        both.referenced_objects().into_iter().collect::<Vec<_>>(),
        vec![
            Reference::to_condition(Id::new("A")),
            Reference::to_condition(Id::new("B")),
        ]
    );

    // A `Condition` key inside a plain property is literal data.
    let document = property(&template, "Policy", "PolicyDocument");
    assert!(document.referenced_objects().is_empty());

    let enabled = property(&template, "Policy", "Enabled");
    assert!(!enabled.has_pending());
    assert_eq!(enabled.referenced_objects().len(), 3);
}

#[test]
fn test_sub_with_variables() {
    let template = assert_parses(
        r#"
Resources:
  Bucket:
    Type: AWS::S3::Bucket
    Properties:
      BucketName: !Sub
        - "${Prefix}-${AWS::AccountId}-${!Literal}"
        - Prefix: !Join ["-", [app, data]]
"#,
    );

    let Operand::Intrinsic(intrinsic) = property(&template, "Bucket", "BucketName") else {
        panic!("expected an intrinsic");
    };
    let Intrinsic::Sub { template: text, variables } = intrinsic.as_ref() else {
        panic!("expected a sub");
    };
    assert_eq!(text, "${Prefix}-${AWS::AccountId}-${!Literal}");
    assert!(variables.contains_key("Prefix"));
    assert!(!variables["Prefix"].has_pending());
}

#[test]
fn test_outputs() {
    let template = assert_parses(
        r#"
Resources:
  Bucket: {Type: AWS::S3::Bucket}
Outputs:
  BucketArn:
    Description: The bucket
    Value: !GetAtt Bucket.Arn
    Export:
      Name: !Sub "${AWS::StackName}-arn"
"#,
    );

    let output = template.output(Id::new("BucketArn")).unwrap();
    assert_eq!(output.description(), Some("The bucket"));
    assert!(output.export_name().is_some());
    assert_eq!(
        output.value().as_intrinsic().map(Intrinsic::tag),
        Some(Tag::GetAtt)
    );
}

// ===================
// Rejected Documents
// ===================

fn assert_error(source: &str, code: ErrorCode) {
    let err = assert_parse_fails(source);
    assert!(
        err.diagnostics().iter().any(|diag| diag.code() == Some(code)),
        "expected {code}, got {err:?}"
    );
}

#[test]
fn test_document_syntax_errors() {
    let err = assert_parse_fails("Resources: [unclosed");
    assert_eq!(err.kind(), Some(ErrorKind::DocumentSyntax));

    assert_error("- just\n- a list\n", ErrorCode::E002);
}

#[test]
fn test_tag_resolution_errors() {
    let unknown = r#"
Resources:
  Bucket:
    Type: AWS::S3::Bucket
    Properties:
      Name: !Reff Other
"#;
    assert_eq!(assert_parse_fails(unknown).kind(), Some(ErrorKind::TagResolution));
    assert_error(unknown, ErrorCode::E100);

    assert_error(
        r#"
Resources:
  Bucket:
    Type: AWS::S3::Bucket
    Properties:
      Name: {"Fn::Concat": [a, b]}
"#,
        ErrorCode::E100,
    );

    assert_error(
        r#"
Parameters:
  Env: {Type: String, Default: !Ref Other}
Resources:
  Bucket: {Type: AWS::S3::Bucket}
"#,
        ErrorCode::E101,
    );

    assert_error(
        r#"
Conditions:
  HasArn: !Equals [!GetAtt Bucket.Arn, ""]
Resources:
  Bucket: {Type: AWS::S3::Bucket}
"#,
        ErrorCode::E101,
    );

    assert_error(
        r#"
Resources:
  Bucket:
    Type: AWS::S3::Bucket
    Properties:
      Name: !Condition IsProd
"#,
        ErrorCode::E101,
    );
}

#[test]
fn test_structural_errors() {
    assert_error("Parameters: {}\n", ErrorCode::E202);
    assert_error(
        "Resources:\n  Bucket:\n    Properties: {}\n",
        ErrorCode::E202,
    );
    assert_error(
        "Resources:\n  Bucket:\n    Type: AWS::S3::Bucket\n    Propertiez: {}\n",
        ErrorCode::E203,
    );
    assert_error(
        "Transform: AWS::Serverless-2016-10-31\nResources:\n  Fn: {Type: AWS::Serverless::Function}\n",
        ErrorCode::E204,
    );
    assert_error(
        "Resources:\n  my-bucket: {Type: AWS::S3::Bucket}\n",
        ErrorCode::E205,
    );
    assert_error(
        "Resource:\n  Bucket: {Type: AWS::S3::Bucket}\n",
        ErrorCode::E207,
    );
    assert_error(
        "Resources:\n  Bucket:\n    Type: AWS::S3::Bucket\n    Properties:\n      Name: !Join [a, b, c]\n",
        ErrorCode::E200,
    );
    assert_error(
        "Resources:\n  Bucket:\n    Type: AWS::S3::Bucket\n    Properties:\n      Name: !If [[not, a, name], a, b]\n",
        ErrorCode::E200,
    );
}

#[test]
fn test_every_malformed_entity_is_reported() {
    let err = assert_parse_fails(
        r#"
Resources:
  First: {Properties: {}}
  Second: {Type: AWS::S3::Bucket, Bogus: 1}
  Third: {Type: AWS::S3::Bucket}
"#,
    );

    assert_eq!(err.diagnostics().len(), 2);
    assert_eq!(err.kind(), Some(ErrorKind::Structural));
}

mod proptests {
    use proptest::prelude::*;

    use super::*;

    fn logical_name_strategy() -> impl Strategy<Value = String> {
        "R[A-Za-z0-9]{0,15}"
    }

    fn check_ref_forms_agree(name: &str) -> Result<(), TestCaseError> {
        let short = parse(&format!(
            "Resources:\n  R:\n    Type: T\n    Properties:\n      P: !Ref {name}\n"
        ));
        let long = parse(&format!(
            "Resources:\n  R:\n    Type: T\n    Properties:\n      P: {{Ref: {name}}}\n"
        ));
        let (short, long) = match (short, long) {
            (Ok(short), Ok(long)) => (short, long),
            (short, long) => {
                return Err(TestCaseError::fail(format!(
                    "failed to parse `{name}`: {:?} / {:?}",
                    short.err(),
                    long.err()
                )));
            }
        };
        prop_assert_eq!(short.resources(), long.resources());
        prop_assert_eq!(
            property(&short, "R", "P"),
            &Operand::intrinsic(Intrinsic::Ref(Id::new(name)))
        );
        Ok(())
    }

    fn check_join_delimiters(delimiter: &str) -> Result<(), TestCaseError> {
        let source = format!(
            "Resources:\n  R:\n    Type: T\n    Properties:\n      P: !Join [{delimiter:?}, [a, b]]\n"
        );
        let template = parse(&source).map_err(|err| TestCaseError::fail(err.to_string()))?;
        let Operand::Intrinsic(join) = property(&template, "R", "P") else {
            return Err(TestCaseError::fail("expected an intrinsic"));
        };
        let Intrinsic::Join { delimiter: found, .. } = join.as_ref() else {
            return Err(TestCaseError::fail("expected a join"));
        };
        prop_assert_eq!(found, &Operand::string(delimiter));
        Ok(())
    }

    proptest! {
        #[test]
        fn ref_forms_agree(name in logical_name_strategy()) {
            check_ref_forms_agree(&name)?;
        }

        #[test]
        fn join_delimiters_survive(delimiter in "[-,;:|/ ]{0,3}") {
            check_join_delimiters(&delimiter)?;
        }
    }
}
