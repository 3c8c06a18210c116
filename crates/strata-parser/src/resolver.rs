//! Context-sensitive resolution of document nodes into operands.
//!
//! A node becomes an intrinsic call when it carries a local tag (`!Join`) or
//! is a single-key mapping whose key names a function (`Fn::Join`, `Ref`).
//! The `Condition` key is the exception: whether `{"Condition": name}` is a
//! call or a literal attribute depends on where it sits, so such mappings and
//! every plain list or mapping handed to an intrinsic are staged as
//! placeholders. The fixup pass resolves them once the owning call exists.

use indexmap::IndexMap;
use log::trace;
use serde_yaml::Value as Document;

use strata_core::{
    identifier::Id,
    intrinsic::{Intrinsic, Tag},
    value::{Operand, PendingId, Scalar, Slot},
};

use crate::{
    error::{Diagnostic, ErrorCode, Result},
    section::{ResolveContext, Section},
};

/// A deferred operand awaiting the fixup pass.
#[derive(Debug, Clone)]
pub struct Placeholder {
    id: PendingId,
    owner: Tag,
    target: Slot,
    section: Section,
    path: String,
    node: Document,
    resolved: bool,
}

impl Placeholder {
    pub fn id(&self) -> PendingId {
        self.id
    }

    /// The intrinsic function the placeholder is an operand of.
    pub fn owner(&self) -> Tag {
        self.owner
    }

    /// The slot inside the owner the resolved operand is written to.
    pub fn target(&self) -> &Slot {
        &self.target
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved
    }
}

/// Resolves document nodes and keeps the placeholder table for one document.
#[derive(Debug, Default)]
pub struct Resolver {
    placeholders: Vec<Placeholder>,
}

impl Resolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves `node` into an operand.
    pub fn resolve(&mut self, node: &Document, ctx: &ResolveContext) -> Result<Operand> {
        if let Some((tag, args)) = intrinsic_call(node, ctx)? {
            ctx.section()
                .permits(tag, ctx.owner())
                .map_err(|reason| misplaced(tag, ctx, reason))?;
            let intrinsic = self.build(tag, args, &ctx.within(tag))?;
            return Ok(Operand::intrinsic(intrinsic));
        }

        match node {
            Document::Sequence(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| self.resolve(item, &ctx.plain(Slot::Index(i))))
                .collect::<Result<Vec<_>>>()
                .map(Operand::List),
            Document::Mapping(mapping) => mapping
                .iter()
                .map(|(key, value)| {
                    let key = mapping_key(key, ctx)?;
                    let operand = self.resolve(value, &ctx.plain(Slot::Key(key.clone())))?;
                    Ok((key, operand))
                })
                .collect::<Result<_>>()
                .map(Operand::Map),
            Document::Tagged(tagged) => Err(unknown_tag(&tagged.tag.to_string(), ctx)),
            leaf => Ok(Operand::Scalar(
                Scalar::from_document(leaf).unwrap_or(Scalar::Null),
            )),
        }
    }

    /// Rejects every intrinsic call inside `node`.
    ///
    /// Used for sections whose content is literal data.
    pub fn check_literal(&self, node: &Document, ctx: &ResolveContext) -> Result<()> {
        if let Some((tag, _)) = intrinsic_call(node, ctx)? {
            let reason = ctx
                .section()
                .permits(tag, ctx.owner())
                .err()
                .unwrap_or("intrinsic functions are not allowed here");
            return Err(misplaced(tag, ctx, reason));
        }
        match node {
            Document::Sequence(items) => items
                .iter()
                .enumerate()
                .try_for_each(|(i, item)| self.check_literal(item, &ctx.plain(Slot::Index(i)))),
            Document::Mapping(mapping) => mapping.iter().try_for_each(|(key, value)| {
                let key = mapping_key(key, ctx)?;
                self.check_literal(value, &ctx.plain(Slot::Key(key)))
            }),
            _ => Ok(()),
        }
    }

    /// Resolves the placeholder `id` found in `slot` of a `owner` call.
    ///
    /// Fails if the placeholder was recorded for a different location or was
    /// already resolved.
    pub fn resolve_placeholder(
        &mut self,
        id: PendingId,
        owner: Option<Tag>,
        slot: &Slot,
        path: &str,
    ) -> Result<Operand> {
        let Some(placeholder) = self.placeholders.get(id.0) else {
            return Err(Diagnostic::error(format!("unknown placeholder {id}"))
                .with_code(ErrorCode::E206)
                .with_label(path, "found here"));
        };

        if placeholder.resolved {
            return Err(
                Diagnostic::error(format!("placeholder {id} was resolved more than once"))
                    .with_code(ErrorCode::E206)
                    .with_label(path, "found again here")
                    .with_secondary_label(placeholder.path.clone(), "recorded here"),
            );
        }
        if owner != Some(placeholder.owner) || *slot != placeholder.target {
            let found =
                owner.map_or_else(|| "a plain collection".to_string(), |t| format!("`{t}`"));
            return Err(Diagnostic::error(format!(
                "placeholder {id} was recorded for `{}` slot `{}` \
                 but found in {found} slot `{slot}`",
                placeholder.owner, placeholder.target
            ))
            .with_code(ErrorCode::E206)
            .with_label(path, "found here")
            .with_secondary_label(placeholder.path.clone(), "recorded here"));
        }

        let node = placeholder.node.clone();
        let ctx = ResolveContext::restore(
            placeholder.section,
            placeholder.path.clone(),
            placeholder.owner,
        );
        trace!(
            id:% = id,
            owner:% = placeholder.owner,
            path = placeholder.path.as_str();
            "Resolving placeholder",
        );

        let operand = self.resolve(&node, &ctx)?;
        if let Some(placeholder) = self.placeholders.get_mut(id.0) {
            placeholder.resolved = true;
        }
        Ok(operand)
    }

    /// Placeholders that were never resolved.
    pub fn unresolved(&self) -> impl Iterator<Item = &Placeholder> {
        self.placeholders.iter().filter(|p| !p.resolved)
    }

    pub fn placeholders(&self) -> &[Placeholder] {
        &self.placeholders
    }

    /// Resolves an operand of an intrinsic call, deferring plain collections.
    fn operand(&mut self, node: &Document, ctx: &ResolveContext, slot: Slot) -> Result<Operand> {
        let child = ctx.child(&slot);
        match ctx.owner() {
            Some(owner) if is_deferred(node) => Ok(self.defer(node, &child, owner, slot)),
            _ => self.resolve(node, &child),
        }
    }

    fn defer(
        &mut self,
        node: &Document,
        ctx: &ResolveContext,
        owner: Tag,
        target: Slot,
    ) -> Operand {
        let id = PendingId(self.placeholders.len());
        trace!(id:% = id, owner:% = owner, path = ctx.path(); "Deferring operand");
        self.placeholders.push(Placeholder {
            id,
            owner,
            target,
            section: ctx.section(),
            path: ctx.path().to_string(),
            node: node.clone(),
            resolved: false,
        });
        Operand::Pending(id)
    }

    /// Builds the typed call for `tag` from its raw arguments.
    fn build(&mut self, tag: Tag, args: &Document, ctx: &ResolveContext) -> Result<Intrinsic> {
        let intrinsic = match tag {
            Tag::And | Tag::Or => {
                let operands = expect_list(tag, args, ctx, 2, 10)?
                    .iter()
                    .enumerate()
                    .map(|(i, item)| self.operand(item, ctx, Slot::Index(i)))
                    .collect::<Result<Vec<_>>>()?;
                if tag == Tag::And {
                    Intrinsic::And(operands)
                } else {
                    Intrinsic::Or(operands)
                }
            }
            Tag::Not => {
                let items = expect_list(tag, args, ctx, 1, 1)?;
                Intrinsic::Not(self.operand(&items[0], ctx, Slot::Field("operand"))?)
            }
            Tag::Equals => {
                let items = expect_list(tag, args, ctx, 2, 2)?;
                Intrinsic::Equals(
                    self.operand(&items[0], ctx, Slot::Field("left"))?,
                    self.operand(&items[1], ctx, Slot::Field("right"))?,
                )
            }
            Tag::Ref => Intrinsic::Ref(logical_name(tag, args, ctx)?),
            Tag::Condition => Intrinsic::Condition(logical_name(tag, args, ctx)?),
            Tag::GetAtt => match args {
                Document::String(text) => {
                    let Some((resource, attribute)) = text.split_once('.') else {
                        return Err(malformed(
                            tag,
                            ctx,
                            "expected `Resource.Attribute` or a two-element list",
                        ));
                    };
                    if resource.is_empty() || attribute.is_empty() {
                        return Err(malformed(tag, ctx, "resource and attribute must not be empty"));
                    }
                    Intrinsic::GetAtt {
                        resource: Id::new(resource),
                        attribute: Operand::string(attribute),
                    }
                }
                _ => {
                    let items = expect_list(tag, args, ctx, 2, 2)?;
                    Intrinsic::GetAtt {
                        resource: logical_name(tag, &items[0], ctx)?,
                        attribute: self.operand(&items[1], ctx, Slot::Field("attribute"))?,
                    }
                }
            },
            Tag::ImportValue => {
                Intrinsic::ImportValue(self.operand(args, ctx, Slot::Field("name"))?)
            }
            Tag::FindInMap => {
                let items = expect_list(tag, args, ctx, 3, 3)?;
                Intrinsic::FindInMap {
                    map: self.operand(&items[0], ctx, Slot::Field("map"))?,
                    top_key: self.operand(&items[1], ctx, Slot::Field("top_key"))?,
                    second_key: self.operand(&items[2], ctx, Slot::Field("second_key"))?,
                }
            }
            Tag::GetAZs => match args {
                Document::Null => Intrinsic::GetAZs(Operand::string("")),
                _ => Intrinsic::GetAZs(self.operand(args, ctx, Slot::Field("region"))?),
            },
            Tag::Cidr => {
                let items = expect_list(tag, args, ctx, 3, 3)?;
                Intrinsic::Cidr {
                    block: self.operand(&items[0], ctx, Slot::Field("block"))?,
                    count: self.operand(&items[1], ctx, Slot::Field("count"))?,
                    bits: self.operand(&items[2], ctx, Slot::Field("bits"))?,
                }
            }
            Tag::Select => {
                let items = expect_list(tag, args, ctx, 2, 2)?;
                Intrinsic::Select {
                    index: self.operand(&items[0], ctx, Slot::Field("index"))?,
                    list: self.operand(&items[1], ctx, Slot::Field("list"))?,
                }
            }
            Tag::Split => {
                let items = expect_list(tag, args, ctx, 2, 2)?;
                Intrinsic::Split {
                    delimiter: self.operand(&items[0], ctx, Slot::Field("delimiter"))?,
                    source: self.operand(&items[1], ctx, Slot::Field("source"))?,
                }
            }
            Tag::Join => {
                let items = expect_list(tag, args, ctx, 2, 2)?;
                Intrinsic::Join {
                    delimiter: self.operand(&items[0], ctx, Slot::Field("delimiter"))?,
                    values: self.operand(&items[1], ctx, Slot::Field("values"))?,
                }
            }
            Tag::Sub => self.build_sub(args, ctx)?,
            Tag::Base64 => Intrinsic::Base64(self.operand(args, ctx, Slot::Field("value"))?),
            Tag::If => {
                let items = expect_list(tag, args, ctx, 3, 3)?;
                Intrinsic::If {
                    condition: logical_name(tag, &items[0], ctx)?,
                    when_true: self.operand(&items[1], ctx, Slot::Field("when_true"))?,
                    when_false: self.operand(&items[2], ctx, Slot::Field("when_false"))?,
                }
            }
        };
        Ok(intrinsic)
    }

    fn build_sub(&mut self, args: &Document, ctx: &ResolveContext) -> Result<Intrinsic> {
        let (template, variables) = match args {
            Document::String(template) => (template.clone(), None),
            _ => {
                let items = expect_list(Tag::Sub, args, ctx, 1, 2)?;
                let Document::String(template) = &items[0] else {
                    return Err(malformed(Tag::Sub, ctx, "the template string must be a literal"));
                };
                (template.clone(), items.get(1))
            }
        };

        let mut resolved = IndexMap::new();
        match variables {
            None => {}
            Some(Document::Mapping(mapping)) => {
                for (key, value) in mapping {
                    let key = mapping_key(key, ctx)?;
                    let operand = self.operand(value, ctx, Slot::Key(key.clone()))?;
                    resolved.insert(key, operand);
                }
            }
            Some(_) => {
                return Err(malformed(Tag::Sub, ctx, "variables must be a mapping"));
            }
        }

        Ok(Intrinsic::Sub {
            template,
            variables: resolved,
        })
    }
}

/// Recognizes an intrinsic call, returning its tag and raw arguments.
fn intrinsic_call<'d>(
    node: &'d Document,
    ctx: &ResolveContext,
) -> Result<Option<(Tag, &'d Document)>> {
    match node {
        Document::Tagged(tagged) => {
            let name = tagged.tag.to_string();
            let tag = Tag::from_name(&name).ok_or_else(|| unknown_tag(&name, ctx))?;
            Ok(Some((tag, &tagged.value)))
        }
        Document::Mapping(mapping) if mapping.len() == 1 => {
            let Some((Document::String(key), args)) = mapping.iter().next() else {
                return Ok(None);
            };
            if !Tag::is_intrinsic_key(key) {
                return Ok(None);
            }
            if key == Tag::Condition.long_name()
                && !ctx.section().condition_key_is_intrinsic(ctx.owner())
            {
                return Ok(None);
            }
            if key == "Fn::Transform" {
                return Err(Diagnostic::error("template macros are not supported")
                    .with_code(ErrorCode::E204)
                    .with_label(ctx.path(), "`Fn::Transform` used here")
                    .with_help("expand the macro before analysing the template"));
            }
            let tag = Tag::from_name(key).ok_or_else(|| unknown_tag(key, ctx))?;
            Ok(Some((tag, args)))
        }
        _ => Ok(None),
    }
}

/// Returns `true` for nodes whose meaning depends on the owning call.
fn is_deferred(node: &Document) -> bool {
    match node {
        Document::Sequence(_) => true,
        Document::Mapping(mapping) => match mapping.iter().next() {
            Some((Document::String(key), _)) if mapping.len() == 1 => {
                !Tag::is_intrinsic_key(key) || key == Tag::Condition.long_name()
            }
            _ => true,
        },
        _ => false,
    }
}

fn expect_list<'d>(
    tag: Tag,
    args: &'d Document,
    ctx: &ResolveContext,
    min: usize,
    max: usize,
) -> Result<&'d [Document]> {
    let expected = if min == max {
        format!("a list of {min} operand{}", if min == 1 { "" } else { "s" })
    } else {
        format!("a list of {min} to {max} operands")
    };
    match args {
        Document::Sequence(items) if (min..=max).contains(&items.len()) => Ok(items),
        Document::Sequence(items) => Err(malformed(
            tag,
            ctx,
            &format!("expected {expected}, found {}", items.len()),
        )),
        _ => Err(malformed(tag, ctx, &format!("expected {expected}"))),
    }
}

fn logical_name(tag: Tag, node: &Document, ctx: &ResolveContext) -> Result<Id> {
    match node {
        Document::String(name) if !name.is_empty() => Ok(Id::new(name)),
        _ => Err(malformed(tag, ctx, "expected a literal logical name")),
    }
}

fn mapping_key(key: &Document, ctx: &ResolveContext) -> Result<String> {
    match Scalar::from_document(key) {
        Some(Scalar::Null) | None => Err(Diagnostic::error("mapping keys must be scalars")
            .with_code(ErrorCode::E208)
            .with_label(ctx.path(), "in this mapping")),
        Some(scalar) => Ok(scalar.to_text()),
    }
}

fn unknown_tag(name: &str, ctx: &ResolveContext) -> Diagnostic {
    let bare = name.trim_start_matches('!');
    let diag = Diagnostic::error(format!("unknown intrinsic function `{bare}`"))
        .with_code(ErrorCode::E100)
        .with_label(ctx.path(), "used here");
    match suggest(bare) {
        Some(tag) => diag.with_help(format!("did you mean `{}`?", tag.long_name())),
        None => diag,
    }
}

fn misplaced(tag: Tag, ctx: &ResolveContext, reason: &str) -> Diagnostic {
    Diagnostic::error(format!(
        "`{tag}` is not allowed in the {} section",
        ctx.section()
    ))
    .with_code(ErrorCode::E101)
    .with_label(ctx.path(), "used here")
    .with_help(reason.to_string())
}

fn malformed(tag: Tag, ctx: &ResolveContext, detail: &str) -> Diagnostic {
    Diagnostic::error(format!("malformed `{tag}` call: {detail}"))
        .with_code(ErrorCode::E200)
        .with_label(ctx.path(), "called here")
}

/// Finds a known function whose name differs from `name` only in case or
/// the `Fn::` prefix.
fn suggest(name: &str) -> Option<Tag> {
    let bare = name.strip_prefix("Fn::").unwrap_or(name);
    Tag::all()
        .iter()
        .copied()
        .find(|tag| tag.short_name().eq_ignore_ascii_case(bare))
}
