use std::fs;

use tempfile::tempdir;

use strata::StrataError;
use strata_cli::{Args, Format, run};

const TEMPLATE: &str = r#"
AWSTemplateFormatVersion: "2010-09-09"
Parameters:
  Env:
    Type: String
    AllowedValues: [dev, prod]
Conditions:
  IsProd: !Equals [!Ref Env, prod]
Resources:
  Logs:
    Type: AWS::S3::Bucket
  Alarm:
    Type: AWS::CloudWatch::Alarm
    Condition: IsProd
    Properties:
      AlarmName: !Sub "${AWS::StackName}-alarm"
      Dimensions:
        - Name: Bucket
          Value: !Ref Logs
Outputs:
  LogsArn:
    Value: !GetAtt Logs.Arn
"#;

fn args(input: String, output: String, format: Format) -> Args {
    Args {
        input,
        output: Some(output),
        format,
        config: None,
        exclude_conditional_resources: false,
        parameters: vec![("Env".to_string(), "dev".to_string())],
        log_level: "off".to_string(),
    }
}

#[test]
fn e2e_report_with_pruning_from_config() {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let input = temp_dir.path().join("stack.yaml");
    let output = temp_dir.path().join("report.txt");
    let config = temp_dir.path().join("config.toml");
    fs::write(&input, TEMPLATE).unwrap();
    fs::write(&config, "[analysis]\nexcludeConditionalResources = true\n").unwrap();

    let mut args = args(
        input.to_string_lossy().to_string(),
        output.to_string_lossy().to_string(),
        Format::Report,
    );
    args.config = Some(config.to_string_lossy().to_string());

    run(&args).expect("Analysis should succeed");

    let report = fs::read_to_string(&output).unwrap();
    assert!(report.contains("  1. Logs (AWS::S3::Bucket)"));
    assert!(!report.contains("Alarm (AWS::CloudWatch::Alarm)"));
    assert!(report.contains("Pruned:\n  resource Alarm"));
    assert!(report.contains("  IsProd = false"));
    assert!(report.contains("  LogsArn = Logs.Arn"));
}

#[test]
fn e2e_dot_output() {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let input = temp_dir.path().join("stack.yaml");
    let output = temp_dir.path().join("graph.dot");
    fs::write(&input, TEMPLATE).unwrap();

    let args = args(
        input.to_string_lossy().to_string(),
        output.to_string_lossy().to_string(),
        Format::Dot,
    );
    run(&args).expect("Analysis should succeed");

    let dot = fs::read_to_string(&output).unwrap();
    assert!(dot.starts_with("digraph"));
    assert!(dot.contains("\"Resources/Alarm\" -> \"Resources/Logs\" [label=\"Ref\"];"));
    assert!(
        dot.contains("\"PseudoParameters/AWS::StackName\" [label=\"AWS::StackName\", shape=note];")
    );
}

#[test]
fn e2e_invalid_template_reports_parse_error() {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let input = temp_dir.path().join("broken.yaml");
    let output = temp_dir.path().join("report.txt");
    fs::write(
        &input,
        "Resources:\n  Queue:\n    Type: AWS::SQS::Queue\n    Properties:\n      Name: !Bogus x\n",
    )
    .unwrap();

    let args = args(
        input.to_string_lossy().to_string(),
        output.to_string_lossy().to_string(),
        Format::Report,
    );
    let err = run(&args).unwrap_err();

    assert!(matches!(err, StrataError::Parse { .. }));
    assert!(!output.exists(), "No output is written on failure");
}

#[test]
fn e2e_missing_input_is_io_error() {
    let temp_dir = tempdir().expect("Failed to create temp directory");

    let args = args(
        temp_dir.path().join("absent.yaml").to_string_lossy().to_string(),
        temp_dir.path().join("out.txt").to_string_lossy().to_string(),
        Format::Report,
    );

    assert!(matches!(run(&args), Err(StrataError::Io(_))));
}
