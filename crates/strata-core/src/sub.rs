//! Placeholder grammar of `Fn::Sub` template strings.
//!
//! - `${Name}` substitutes a parameter, resource or pseudo-parameter.
//! - `${Resource.Attribute}` substitutes a resource attribute.
//! - `${!Text}` is an escape and yields the literal `${Text}`.
//!
//! An unterminated `${` is kept as literal text.

/// One piece of a parsed `Fn::Sub` string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubSegment {
    Literal(String),
    Ref(String),
    GetAtt { resource: String, attribute: String },
}

/// Splits a `Fn::Sub` string into literal text and placeholders.
pub fn parse(template: &str) -> Vec<SubSegment> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut rest = template;

    while let Some(start) = rest.find("${") {
        literal.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            literal.push_str(&rest[start..]);
            rest = "";
            break;
        };
        let body = &after[..end];
        rest = &after[end + 1..];

        if let Some(escaped) = body.strip_prefix('!') {
            literal.push_str("${");
            literal.push_str(escaped);
            literal.push('}');
            continue;
        }

        if !literal.is_empty() {
            segments.push(SubSegment::Literal(std::mem::take(&mut literal)));
        }
        segments.push(placeholder(body.trim()));
    }

    literal.push_str(rest);
    if !literal.is_empty() {
        segments.push(SubSegment::Literal(literal));
    }
    segments
}

fn placeholder(body: &str) -> SubSegment {
    match body.split_once('.') {
        Some((resource, attribute)) if !resource.contains("::") => SubSegment::GetAtt {
            resource: resource.to_string(),
            attribute: attribute.to_string(),
        },
        _ => SubSegment::Ref(body.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text() {
        assert_eq!(
            parse("no placeholders"),
            vec![SubSegment::Literal("no placeholders".to_string())]
        );
        assert!(parse("").is_empty());
    }

    #[test]
    fn test_ref_and_getatt() {
        assert_eq!(
            parse("arn:${AWS::Partition}:s3:::${Bucket}/${Role.Arn}"),
            vec![
                SubSegment::Literal("arn:".to_string()),
                SubSegment::Ref("AWS::Partition".to_string()),
                SubSegment::Literal(":s3:::".to_string()),
                SubSegment::Ref("Bucket".to_string()),
                SubSegment::Literal("/".to_string()),
                SubSegment::GetAtt {
                    resource: "Role".to_string(),
                    attribute: "Arn".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_escape() {
        assert_eq!(
            parse("${!Literal}-${Name}"),
            vec![
                SubSegment::Literal("${Literal}-".to_string()),
                SubSegment::Ref("Name".to_string()),
            ]
        );
    }

    #[test]
    fn test_unterminated_placeholder_is_literal() {
        assert_eq!(
            parse("prefix-${Name"),
            vec![SubSegment::Literal("prefix-${Name".to_string())]
        );
    }

    #[test]
    fn test_nested_attribute_path() {
        assert_eq!(
            parse("${Db.Endpoint.Address}"),
            vec![SubSegment::GetAtt {
                resource: "Db".to_string(),
                attribute: "Endpoint.Address".to_string(),
            }]
        );
    }
}
